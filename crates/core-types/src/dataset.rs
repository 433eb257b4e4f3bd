use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single fund or firm whose reported returns are under examination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Logarithmic returns, one per dataset date.
    pub returns: Vec<f64>,
    /// Optional peer group label. Entities without a label share one implicit group.
    #[serde(default)]
    pub group: Option<String>,
}

/// Style-factor return series, stored column by column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorMatrix {
    pub names: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl FactorMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }
}

/// The validated, read-only input of a run.
///
/// Construction goes through [`Dataset::new`] (or deserialization, which calls it), so every
/// instance in circulation satisfies the shape invariants: one date per observation, equal
/// lengths everywhere, unique entity names, finite values, at least one style factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    dates: Vec<NaiveDate>,
    entities: Vec<Entity>,
    factors: FactorMatrix,
}

#[derive(Deserialize)]
struct RawDataset {
    dates: Vec<NaiveDate>,
    entities: Vec<Entity>,
    factors: FactorMatrix,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = CoreError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        Dataset::new(raw.dates, raw.entities, raw.factors)
    }
}

impl Dataset {
    pub fn new(
        dates: Vec<NaiveDate>,
        entities: Vec<Entity>,
        factors: FactorMatrix,
    ) -> Result<Self, CoreError> {
        let observations = dates.len();
        if observations == 0 {
            return Err(invalid("dates", "at least one observation is required"));
        }
        if entities.is_empty() {
            return Err(invalid("entities", "at least one entity is required"));
        }

        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if entity.name.trim().is_empty() {
                return Err(invalid("entities", "entity names must not be empty"));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(invalid(
                    "entities",
                    &format!("duplicate entity name '{}'", entity.name),
                ));
            }
            check_series(&entity.name, &entity.returns, observations)?;
        }

        if factors.is_empty() {
            return Err(invalid("factors", "at least one style factor is required"));
        }
        if factors.names.len() != factors.columns.len() {
            return Err(invalid(
                "factors",
                &format!(
                    "{} names supplied for {} columns",
                    factors.names.len(),
                    factors.columns.len()
                ),
            ));
        }
        for (name, column) in factors.names.iter().zip(&factors.columns) {
            check_series(name, column, observations)?;
        }

        tracing::debug!(
            entities = entities.len(),
            observations,
            factors = factors.len(),
            "Dataset validated."
        );

        Ok(Self {
            dates,
            entities,
            factors,
        })
    }

    /// Number of observations (T).
    pub fn observations(&self) -> usize {
        self.dates.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Result<&Entity, CoreError> {
        self.entities
            .get(index)
            .ok_or(CoreError::UnknownEntity(index))
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }

    pub fn factors(&self) -> &FactorMatrix {
        &self.factors
    }

    /// Equal-weighted mean return of the entity's group peers, excluding the entity itself.
    pub fn peer_index(&self, index: usize) -> Result<Vec<f64>, CoreError> {
        let entity = self.entity(index)?;
        let peers: Vec<&Entity> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(i, other)| *i != index && other.group == entity.group)
            .map(|(_, other)| other)
            .collect();

        if peers.is_empty() {
            return Err(CoreError::NoPeerGroup(entity.name.clone()));
        }

        let weight = 1.0 / peers.len() as f64;
        let mut index_returns = vec![0.0; self.observations()];
        for peer in peers {
            for (acc, r) in index_returns.iter_mut().zip(&peer.returns) {
                *acc += r * weight;
            }
        }
        Ok(index_returns)
    }
}

fn check_series(name: &str, values: &[f64], observations: usize) -> Result<(), CoreError> {
    if values.len() != observations {
        return Err(invalid(
            name,
            &format!("expected {} observations, found {}", observations, values.len()),
        ));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(invalid(name, &format!("non-finite value at position {}", pos)));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> CoreError {
    CoreError::InvalidInput(field.to_string(), reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        (0..n).map(|i| start + chrono::Days::new(i as u64)).collect()
    }

    fn entity(name: &str, returns: Vec<f64>, group: Option<&str>) -> Entity {
        Entity {
            name: name.to_string(),
            returns,
            group: group.map(str::to_string),
        }
    }

    fn factors(n: usize) -> FactorMatrix {
        FactorMatrix {
            names: vec!["Market".to_string()],
            columns: vec![vec![0.01; n]],
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = Dataset::new(
            dates(2),
            vec![
                entity("A", vec![0.1, 0.2], None),
                entity("A", vec![0.1, 0.2], None),
            ],
            factors(2),
        );
        assert!(matches!(result, Err(CoreError::InvalidInput(_, _))));
    }

    #[test]
    fn rejects_length_mismatch_and_non_finite_values() {
        let short = Dataset::new(dates(3), vec![entity("A", vec![0.1], None)], factors(3));
        assert!(short.is_err());

        let nan = Dataset::new(
            dates(2),
            vec![entity("A", vec![0.1, f64::NAN], None)],
            factors(2),
        );
        assert!(nan.is_err());
    }

    #[test]
    fn peer_index_averages_same_group_only() {
        let dataset = Dataset::new(
            dates(2),
            vec![
                entity("A", vec![0.0, 0.0], Some("macro")),
                entity("B", vec![0.2, 0.4], Some("macro")),
                entity("C", vec![0.4, 0.8], Some("macro")),
                entity("D", vec![9.0, 9.0], Some("credit")),
            ],
            factors(2),
        )
        .unwrap();

        let index = dataset.peer_index(0).unwrap();
        assert!((index[0] - 0.3).abs() < 1e-12);
        assert!((index[1] - 0.6).abs() < 1e-12);

        assert_eq!(
            dataset.peer_index(3),
            Err(CoreError::NoPeerGroup("D".to_string()))
        );
    }

    #[test]
    fn deserializes_through_validation() {
        let json = r#"{
            "dates": ["2020-01-31", "2020-02-29"],
            "entities": [{"name": "A", "returns": [0.01, -0.02]}],
            "factors": {"names": ["Market"], "columns": [[0.01, 0.02]]}
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.observations(), 2);
        assert_eq!(dataset.entities()[0].group, None);

        let broken = r#"{
            "dates": ["2020-01-31"],
            "entities": [{"name": "A", "returns": [0.01, -0.02]}],
            "factors": {"names": ["Market"], "columns": [[0.01]]}
        }"#;
        assert!(serde_json::from_str::<Dataset>(broken).is_err());
    }
}
