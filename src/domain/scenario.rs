//! Historical stress scenario windows.

use crate::domain::{DefinitionError, ScenarioId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unvalidated scenario row as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRecord {
    pub scenario_id: ScenarioId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScenarioRecord {
    pub fn new(scenario_id: ScenarioId, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            scenario_id,
            start_date,
            end_date,
        }
    }
}

/// A validated scenario window; `start_date < end_date` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    id: ScenarioId,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl Scenario {
    pub fn new(
        id: ScenarioId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, DefinitionError> {
        if start_date >= end_date {
            return Err(DefinitionError::InvertedScenario {
                scenario: id,
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            id,
            start_date,
            end_date,
        })
    }

    pub fn id(&self) -> &ScenarioId {
        &self.id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

impl TryFrom<ScenarioRecord> for Scenario {
    type Error = DefinitionError;

    fn try_from(record: ScenarioRecord) -> Result<Self, Self::Error> {
        Scenario::new(record.scenario_id, record.start_date, record.end_date)
    }
}
