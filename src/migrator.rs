use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_projects_tables::Migration),
            Box::new(m20240301_000002_create_scope_items_table::Migration),
            Box::new(m20240301_000003_create_drawings_tables::Migration),
            Box::new(m20240301_000004_create_materials_tables::Migration),
            Box::new(m20240301_000005_create_milestones_and_snags_tables::Migration),
            Box::new(m20240301_000006_create_reports_tables::Migration),
            Box::new(m20240301_000007_create_activity_and_notifications_tables::Migration),
        ]
    }
}

/// Shared identifiers so later migrations can reference earlier tables.
#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    ProjectCode,
    Name,
    ClientName,
    Status,
    Currency,
    ContractValue,
    StartDate,
    InstallationDate,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ScopeItems {
    Table,
    Id,
    ProjectId,
    ItemCode,
    Name,
    Description,
    ItemPath,
    Status,
    Quantity,
    Unit,
    ProductionPercentage,
    InitialUnitCost,
    InitialTotalCost,
    ActualUnitCost,
    ActualTotalCost,
    UnitSalesPrice,
    TotalSalesPrice,
    Notes,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Materials {
    Table,
    Id,
    ProjectId,
    MaterialCode,
    Name,
    Specification,
    Supplier,
    ImageUrls,
    Status,
    SentToClientAt,
    ClientResponseAt,
    ClientComments,
    ApprovedBy,
    DecidedAt,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Reports {
    Table,
    Id,
    ProjectId,
    Title,
    ReportType,
    IsPublished,
    PublishedAt,
    ShareInternal,
    ShareWithClient,
    CreatedBy,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

fn index(name: &str, table: impl IntoTableRef, col: impl IntoIndexColumn) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(name)
        .table(table)
        .col(col)
        .to_owned()
}

mod m20240301_000001_create_projects_tables {
    use super::{index, Projects, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_projects_tables"
        }
    }

    #[derive(Iden)]
    enum ProjectAssignments {
        Table,
        Id,
        ProjectId,
        UserId,
        AssignedBy,
        IsDeleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Projects::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Projects::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Projects::ProjectCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Projects::Name).string().not_null())
                        .col(ColumnDef::new(Projects::ClientName).string().not_null())
                        .col(ColumnDef::new(Projects::Status).string().not_null())
                        .col(ColumnDef::new(Projects::Currency).string().not_null())
                        .col(ColumnDef::new(Projects::ContractValue).double().null())
                        .col(ColumnDef::new(Projects::StartDate).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Projects::InstallationDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Projects::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Projects::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Projects::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index("idx_projects_status", Projects::Table, Projects::Status))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProjectAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProjectAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProjectAssignments::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(ProjectAssignments::UserId).uuid().not_null())
                        .col(ColumnDef::new(ProjectAssignments::AssignedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProjectAssignments::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProjectAssignments::DeletedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(ProjectAssignments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProjectAssignments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_assignments_project_id")
                                .from(ProjectAssignments::Table, ProjectAssignments::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_project_assignments_user_id")
                                .from(ProjectAssignments::Table, ProjectAssignments::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_project_assignments_project_user")
                        .table(ProjectAssignments::Table)
                        .col(ProjectAssignments::ProjectId)
                        .col(ProjectAssignments::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_project_assignments_user_id",
                    ProjectAssignments::Table,
                    ProjectAssignments::UserId,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProjectAssignments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Projects::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000002_create_scope_items_table {
    use super::{index, Projects, ScopeItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_scope_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ScopeItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ScopeItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ScopeItems::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(ScopeItems::ItemCode).string().not_null())
                        .col(ColumnDef::new(ScopeItems::Name).string().not_null())
                        .col(ColumnDef::new(ScopeItems::Description).text().null())
                        .col(ColumnDef::new(ScopeItems::ItemPath).string().not_null())
                        .col(ColumnDef::new(ScopeItems::Status).string().not_null())
                        .col(
                            ColumnDef::new(ScopeItems::Quantity)
                                .double()
                                .not_null()
                                .default(1.0),
                        )
                        .col(ColumnDef::new(ScopeItems::Unit).string().null())
                        .col(
                            ColumnDef::new(ScopeItems::ProductionPercentage)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ScopeItems::InitialUnitCost).double().null())
                        .col(ColumnDef::new(ScopeItems::InitialTotalCost).double().null())
                        .col(ColumnDef::new(ScopeItems::ActualUnitCost).double().null())
                        .col(ColumnDef::new(ScopeItems::ActualTotalCost).double().null())
                        .col(ColumnDef::new(ScopeItems::UnitSalesPrice).double().null())
                        .col(ColumnDef::new(ScopeItems::TotalSalesPrice).double().null())
                        .col(ColumnDef::new(ScopeItems::Notes).text().null())
                        .col(
                            ColumnDef::new(ScopeItems::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ScopeItems::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(ScopeItems::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_scope_items_project_id")
                                .from(ScopeItems::Table, ScopeItems::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_scope_items_project_id",
                    ScopeItems::Table,
                    ScopeItems::ProjectId,
                ))
                .await?;

            manager
                .create_index(index("idx_scope_items_status", ScopeItems::Table, ScopeItems::Status))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ScopeItems::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000003_create_drawings_tables {
    use super::{index, Projects, ScopeItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_drawings_tables"
        }
    }

    #[derive(Iden)]
    enum Drawings {
        Table,
        Id,
        ItemId,
        ProjectId,
        Status,
        CurrentRevision,
        SentToClientAt,
        ClientResponseAt,
        ClientComments,
        PmOverride,
        PmOverrideReason,
        PmOverrideBy,
        PmOverrideAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum DrawingRevisions {
        Table,
        Id,
        DrawingId,
        Revision,
        FileUrl,
        FileName,
        FileSize,
        UploadedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Drawings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drawings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Drawings::ItemId).uuid().not_null().unique_key())
                        .col(ColumnDef::new(Drawings::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(Drawings::Status).string().not_null())
                        .col(ColumnDef::new(Drawings::CurrentRevision).string().null())
                        .col(ColumnDef::new(Drawings::SentToClientAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Drawings::ClientResponseAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Drawings::ClientComments).text().null())
                        .col(
                            ColumnDef::new(Drawings::PmOverride)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Drawings::PmOverrideReason).text().null())
                        .col(ColumnDef::new(Drawings::PmOverrideBy).uuid().null())
                        .col(ColumnDef::new(Drawings::PmOverrideAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Drawings::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Drawings::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_drawings_item_id")
                                .from(Drawings::Table, Drawings::ItemId)
                                .to(ScopeItems::Table, ScopeItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_drawings_project_id")
                                .from(Drawings::Table, Drawings::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index("idx_drawings_project_id", Drawings::Table, Drawings::ProjectId))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DrawingRevisions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DrawingRevisions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DrawingRevisions::DrawingId).uuid().not_null())
                        .col(ColumnDef::new(DrawingRevisions::Revision).string().not_null())
                        .col(ColumnDef::new(DrawingRevisions::FileUrl).string().not_null())
                        .col(ColumnDef::new(DrawingRevisions::FileName).string().not_null())
                        .col(ColumnDef::new(DrawingRevisions::FileSize).big_integer().null())
                        .col(ColumnDef::new(DrawingRevisions::UploadedBy).uuid().not_null())
                        .col(ColumnDef::new(DrawingRevisions::Notes).text().null())
                        .col(
                            ColumnDef::new(DrawingRevisions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DrawingRevisions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_drawing_revisions_drawing_id")
                                .from(DrawingRevisions::Table, DrawingRevisions::DrawingId)
                                .to(Drawings::Table, Drawings::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_drawing_revisions_drawing_revision")
                        .table(DrawingRevisions::Table)
                        .col(DrawingRevisions::DrawingId)
                        .col(DrawingRevisions::Revision)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DrawingRevisions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Drawings::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000004_create_materials_tables {
    use super::{index, Materials, Projects, ScopeItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_materials_tables"
        }
    }

    #[derive(Iden)]
    enum ItemMaterials {
        Table,
        Id,
        ItemId,
        MaterialId,
        IsDeleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Materials::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Materials::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(Materials::MaterialCode).string().not_null())
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::Specification).text().null())
                        .col(ColumnDef::new(Materials::Supplier).string().null())
                        .col(
                            ColumnDef::new(Materials::ImageUrls)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(ColumnDef::new(Materials::Status).string().not_null())
                        .col(ColumnDef::new(Materials::SentToClientAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Materials::ClientResponseAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Materials::ClientComments).text().null())
                        .col(ColumnDef::new(Materials::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(Materials::DecidedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Materials::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Materials::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Materials::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_materials_project_id")
                                .from(Materials::Table, Materials::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_materials_project_id",
                    Materials::Table,
                    Materials::ProjectId,
                ))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemMaterials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemMaterials::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ItemMaterials::ItemId).uuid().not_null())
                        .col(ColumnDef::new(ItemMaterials::MaterialId).uuid().not_null())
                        .col(
                            ColumnDef::new(ItemMaterials::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ItemMaterials::DeletedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(ItemMaterials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ItemMaterials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_materials_item_id")
                                .from(ItemMaterials::Table, ItemMaterials::ItemId)
                                .to(ScopeItems::Table, ScopeItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_materials_material_id")
                                .from(ItemMaterials::Table, ItemMaterials::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_materials_pair")
                        .table(ItemMaterials::Table)
                        .col(ItemMaterials::ItemId)
                        .col(ItemMaterials::MaterialId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ItemMaterials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000005_create_milestones_and_snags_tables {
    use super::{index, Projects, ScopeItems};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_milestones_and_snags_tables"
        }
    }

    #[derive(Iden)]
    enum Milestones {
        Table,
        Id,
        ProjectId,
        Name,
        Description,
        DueDate,
        IsCompleted,
        CompletedAt,
        AlertDaysBefore,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Snags {
        Table,
        Id,
        ProjectId,
        ItemId,
        Title,
        Description,
        Location,
        PhotoUrls,
        IsResolved,
        ResolvedAt,
        ResolvedBy,
        ReportedBy,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Milestones::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Milestones::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Milestones::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(Milestones::Name).string().not_null())
                        .col(ColumnDef::new(Milestones::Description).text().null())
                        .col(ColumnDef::new(Milestones::DueDate).timestamp_with_time_zone().not_null())
                        .col(
                            ColumnDef::new(Milestones::IsCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Milestones::CompletedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Milestones::AlertDaysBefore)
                                .integer()
                                .not_null()
                                .default(7),
                        )
                        .col(
                            ColumnDef::new(Milestones::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Milestones::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Milestones::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_milestones_project_id")
                                .from(Milestones::Table, Milestones::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_milestones_project_id",
                    Milestones::Table,
                    Milestones::ProjectId,
                ))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Snags::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Snags::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Snags::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(Snags::ItemId).uuid().null())
                        .col(ColumnDef::new(Snags::Title).string().not_null())
                        .col(ColumnDef::new(Snags::Description).text().null())
                        .col(ColumnDef::new(Snags::Location).string().null())
                        .col(
                            ColumnDef::new(Snags::PhotoUrls)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(Snags::IsResolved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Snags::ResolvedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Snags::ResolvedBy).uuid().null())
                        .col(ColumnDef::new(Snags::ReportedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Snags::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Snags::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Snags::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_snags_project_id")
                                .from(Snags::Table, Snags::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_snags_item_id")
                                .from(Snags::Table, Snags::ItemId)
                                .to(ScopeItems::Table, ScopeItems::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index("idx_snags_project_id", Snags::Table, Snags::ProjectId))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Snags::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Milestones::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000006_create_reports_tables {
    use super::{index, Projects, Reports};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_reports_tables"
        }
    }

    #[derive(Iden)]
    enum ReportLines {
        Table,
        Id,
        ReportId,
        LineOrder,
        Title,
        Description,
        PhotoUrls,
        IsDeleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reports::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reports::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reports::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(Reports::Title).string().not_null())
                        .col(ColumnDef::new(Reports::ReportType).string().not_null())
                        .col(
                            ColumnDef::new(Reports::IsPublished)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Reports::PublishedAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Reports::ShareInternal)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Reports::ShareWithClient)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Reports::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Reports::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Reports::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Reports::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reports_project_id")
                                .from(Reports::Table, Reports::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index("idx_reports_project_id", Reports::Table, Reports::ProjectId))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReportLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ReportLines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ReportLines::ReportId).uuid().not_null())
                        .col(ColumnDef::new(ReportLines::LineOrder).integer().not_null())
                        .col(ColumnDef::new(ReportLines::Title).string().not_null())
                        .col(ColumnDef::new(ReportLines::Description).text().null())
                        .col(
                            ColumnDef::new(ReportLines::PhotoUrls)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(ReportLines::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ReportLines::DeletedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(ReportLines::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(ReportLines::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_report_lines_report_id")
                                .from(ReportLines::Table, ReportLines::ReportId)
                                .to(Reports::Table, Reports::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_report_lines_report_id",
                    ReportLines::Table,
                    ReportLines::ReportId,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReportLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Reports::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000007_create_activity_and_notifications_tables {
    use super::{index, Projects, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000007_create_activity_and_notifications_tables"
        }
    }

    #[derive(Iden)]
    enum ActivityLogs {
        Table,
        Id,
        ProjectId,
        UserId,
        EntityType,
        EntityId,
        Action,
        Details,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        ProjectId,
        Kind,
        Title,
        Message,
        IsRead,
        CreatedAt,
        UpdatedAt,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ActivityLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ActivityLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ActivityLogs::ProjectId).uuid().not_null())
                        .col(ColumnDef::new(ActivityLogs::UserId).uuid().not_null())
                        .col(ColumnDef::new(ActivityLogs::EntityType).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::EntityId).uuid().not_null())
                        .col(ColumnDef::new(ActivityLogs::Action).string().not_null())
                        .col(
                            ColumnDef::new(ActivityLogs::Details)
                                .text()
                                .not_null()
                                .default("{}"),
                        )
                        .col(
                            ColumnDef::new(ActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActivityLogs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_activity_logs_project_id")
                                .from(ActivityLogs::Table, ActivityLogs::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_activity_logs_project_id",
                    ActivityLogs::Table,
                    ActivityLogs::ProjectId,
                ))
                .await?;

            manager
                .create_index(index(
                    "idx_activity_logs_entity_id",
                    ActivityLogs::Table,
                    ActivityLogs::EntityId,
                ))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Notifications::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                        .col(ColumnDef::new(Notifications::ProjectId).uuid().null())
                        .col(ColumnDef::new(Notifications::Kind).string().not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(
                            ColumnDef::new(Notifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_notifications_user_id")
                                .from(Notifications::Table, Notifications::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_notifications_project_id")
                                .from(Notifications::Table, Notifications::ProjectId)
                                .to(Projects::Table, Projects::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_notifications_user_id",
                    Notifications::Table,
                    Notifications::UserId,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
                .await
        }
    }
}
