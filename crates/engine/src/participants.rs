//! Project participants and their roles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Role of a user in a project; decides who receives which part of a
/// settlement.
///
/// - `investor`: holds shares and receives income pro rata.
/// - `operator`: runs the vehicle, created the project, takes the operator fee.
/// - `platform`: the marketplace itself, takes the platform fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Investor,
    Operator,
    Platform,
}

impl ParticipantRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Operator => "operator",
            Self::Platform => "platform",
        }
    }

    pub fn can_manage_project(self) -> bool {
        matches!(self, Self::Operator | Self::Platform)
    }
}

impl TryFrom<&str> for ParticipantRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "investor" => Ok(Self::Investor),
            "operator" => Ok(Self::Operator),
            "platform" => Ok(Self::Platform),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid participant role: {other}"
            ))),
        }
    }
}

/// A participant together with the shares currently held.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub role: ParticipantRole,
    pub share_count: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Projects,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
