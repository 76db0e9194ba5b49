/*!
 * # Role-Based Access Control
 *
 * Roles are a closed set and every permission question is answered by the
 * static capability table in [`Role::capabilities`].
 */

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Pm,
    Production,
    Procurement,
    Management,
    Client,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ViewAllProjects,
    ManageProjects,
    ManageScopeItems,
    UpdateProduction,
    ViewCosts,
    ViewFinancials,
    UploadDrawings,
    SendDrawingsToClient,
    RecordClientDecision,
    OverrideDrawing,
    ManageMaterials,
    DecideMaterial,
    DecideMaterialDirectly,
    ManageMilestones,
    ManageReports,
    PublishReports,
    ManageSnagging,
    ImportExport,
}

use Capability::*;

const ADMIN: &[Capability] = &[
    ViewAllProjects,
    ManageProjects,
    ManageScopeItems,
    UpdateProduction,
    ViewCosts,
    ViewFinancials,
    UploadDrawings,
    SendDrawingsToClient,
    RecordClientDecision,
    OverrideDrawing,
    ManageMaterials,
    DecideMaterial,
    DecideMaterialDirectly,
    ManageMilestones,
    ManageReports,
    PublishReports,
    ManageSnagging,
    ImportExport,
];

const PM: &[Capability] = &[
    ManageProjects,
    ManageScopeItems,
    UpdateProduction,
    ViewCosts,
    UploadDrawings,
    SendDrawingsToClient,
    RecordClientDecision,
    OverrideDrawing,
    ManageMaterials,
    DecideMaterial,
    DecideMaterialDirectly,
    ManageMilestones,
    ManageReports,
    PublishReports,
    ManageSnagging,
    ImportExport,
];

const PRODUCTION: &[Capability] = &[UpdateProduction, ViewCosts, UploadDrawings, ManageSnagging];

const PROCUREMENT: &[Capability] = &[ManageScopeItems, ViewCosts, ManageMaterials, ImportExport];

const MANAGEMENT: &[Capability] = &[ViewAllProjects, ViewCosts, ViewFinancials];

const CLIENT: &[Capability] = &[RecordClientDecision, DecideMaterial];

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN,
            Role::Pm => PM,
            Role::Production => PRODUCTION,
            Role::Procurement => PROCUREMENT,
            Role::Management => MANAGEMENT,
            Role::Client => CLIENT,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Roles without global visibility are limited to projects they are assigned to.
    pub fn sees_all_projects(self) -> bool {
        self.can(ViewAllProjects)
    }

    pub fn sees_costs(self) -> bool {
        self.can(ViewCosts)
    }
}
