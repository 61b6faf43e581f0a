use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::Discipline;
use crate::error::ConfigError;

/// Dense rider index into a [`RiderRegistry`]. Follows input order, so it doubles
/// as the stable tie-break everywhere a ranking needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiderId(pub usize);

impl RiderId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ability score (0-100) per discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Abilities {
    #[serde(default)]
    pub sprint: u32,
    #[serde(default)]
    pub punch: u32,
    #[serde(default)]
    pub itt: u32,
    #[serde(default)]
    pub mountain: u32,
    #[serde(default)]
    pub breakaway: u32,
}

impl Abilities {
    pub fn get(&self, discipline: Discipline) -> u32 {
        match discipline {
            Discipline::Sprint => self.sprint,
            Discipline::Punch => self.punch,
            Discipline::TimeTrial => self.itt,
            Discipline::Mountain => self.mountain,
            Discipline::Breakaway => self.breakaway,
        }
    }

    /// Same score in every discipline.
    pub fn uniform(score: u32) -> Self {
        Self {
            sprint: score,
            punch: score,
            itt: score,
            mountain: score,
            breakaway: score,
        }
    }
}

/// A rider as entered in the race configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub name: String,
    /// Club / trade team. Used for the per-club cap and teammate bonuses.
    pub team: String,
    pub age: u32,
    pub price: f64,
    /// Probability of not finishing the whole race.
    #[serde(default)]
    pub abandon_probability: f64,
    pub abilities: Abilities,
}

impl Rider {
    fn validate(&self) -> Result<(), ConfigError> {
        for d in Discipline::ALL {
            let value = self.abilities.get(d);
            if value > 100 {
                return Err(ConfigError::AbilityOutOfRange {
                    rider: self.name.clone(),
                    discipline: d.to_string(),
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.abandon_probability) {
            return Err(ConfigError::InvalidAbandonProbability {
                rider: self.name.clone(),
                value: self.abandon_probability,
            });
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ConfigError::InvalidPrice {
                rider: self.name.clone(),
                value: self.price,
            });
        }
        Ok(())
    }
}

/// Validated rider catalog. Read-only while a race is simulated; edits between
/// runs go through [`RiderRegistry::update`] and are re-validated.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RiderRegistry {
    riders: Vec<Rider>,
    #[serde(skip)]
    by_name: HashMap<String, RiderId>,
}

impl RiderRegistry {
    pub fn new(riders: Vec<Rider>) -> Result<Self, ConfigError> {
        if riders.is_empty() {
            return Err(ConfigError::NoRiders);
        }
        let mut by_name = HashMap::with_capacity(riders.len());
        for (i, rider) in riders.iter().enumerate() {
            rider.validate()?;
            if by_name.insert(rider.name.clone(), RiderId(i)).is_some() {
                return Err(ConfigError::DuplicateRider(rider.name.clone()));
            }
        }
        Ok(Self { riders, by_name })
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn get(&self, id: RiderId) -> &Rider {
        &self.riders[id.0]
    }

    /// `None` for an id from another registry.
    pub fn try_get(&self, id: RiderId) -> Option<&Rider> {
        self.riders.get(id.0)
    }

    pub fn riders(&self) -> &[Rider] {
        &self.riders
    }

    pub fn ids(&self) -> impl Iterator<Item = RiderId> {
        (0..self.riders.len()).map(RiderId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiderId, &Rider)> {
        self.riders.iter().enumerate().map(|(i, r)| (RiderId(i), r))
    }

    pub fn id_of(&self, name: &str) -> Option<RiderId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: RiderId) -> &str {
        &self.riders[id.0].name
    }

    /// Edit one rider in place. The change is rolled back if it makes the
    /// registry invalid (a rename onto an existing name, an out-of-range score).
    pub fn update<F>(&mut self, id: RiderId, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Rider),
    {
        let original = self.riders[id.0].clone();
        edit(&mut self.riders[id.0]);
        let edited = &self.riders[id.0];

        let check = edited.validate().and_then(|()| match self.by_name.get(&edited.name) {
            Some(other) if *other != id => Err(ConfigError::DuplicateRider(edited.name.clone())),
            _ => Ok(()),
        });
        if let Err(e) = check {
            self.riders[id.0] = original;
            return Err(e);
        }
        if edited.name != original.name {
            let name = edited.name.clone();
            self.by_name.remove(&original.name);
            self.by_name.insert(name, id);
        }
        Ok(())
    }
}

impl PartialEq for RiderRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.riders == other.riders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rider(name: &str, team: &str) -> Rider {
        Rider {
            name: name.into(),
            team: team.into(),
            age: 27,
            price: 1.5,
            abandon_probability: 0.1,
            abilities: Abilities::uniform(70),
        }
    }

    #[test]
    fn ids_follow_input_order() {
        let reg = RiderRegistry::new(vec![make_rider("A", "X"), make_rider("B", "Y")]).unwrap();
        assert_eq!(reg.id_of("A"), Some(RiderId(0)));
        assert_eq!(reg.id_of("B"), Some(RiderId(1)));
        assert_eq!(reg.name(RiderId(1)), "B");
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RiderRegistry::new(vec![make_rider("A", "X"), make_rider("A", "Y")]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateRider("A".into()));
    }

    #[test]
    fn empty_list_rejected() {
        assert_eq!(RiderRegistry::new(vec![]).unwrap_err(), ConfigError::NoRiders);
    }

    #[test]
    fn ability_above_100_rejected() {
        let mut r = make_rider("A", "X");
        r.abilities.mountain = 101;
        assert!(matches!(
            RiderRegistry::new(vec![r]),
            Err(ConfigError::AbilityOutOfRange { value: 101, .. })
        ));
    }

    #[test]
    fn abandon_probability_bounds() {
        let mut r = make_rider("A", "X");
        r.abandon_probability = 1.2;
        assert!(matches!(
            RiderRegistry::new(vec![r.clone()]),
            Err(ConfigError::InvalidAbandonProbability { .. })
        ));
        r.abandon_probability = f64::NAN;
        assert!(RiderRegistry::new(vec![r]).is_err());
    }

    #[test]
    fn negative_price_rejected() {
        let mut r = make_rider("A", "X");
        r.price = -0.5;
        assert!(matches!(
            RiderRegistry::new(vec![r]),
            Err(ConfigError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn update_applies_and_reindexes() {
        let mut reg = RiderRegistry::new(vec![make_rider("A", "X"), make_rider("B", "Y")]).unwrap();
        reg.update(RiderId(0), |r| {
            r.name = "C".into();
            r.price = 3.0;
        })
        .unwrap();
        assert_eq!(reg.id_of("C"), Some(RiderId(0)));
        assert_eq!(reg.id_of("A"), None);
        assert_eq!(reg.get(RiderId(0)).price, 3.0);
    }

    #[test]
    fn invalid_update_rolls_back() {
        let mut reg = RiderRegistry::new(vec![make_rider("A", "X"), make_rider("B", "Y")]).unwrap();
        let err = reg.update(RiderId(0), |r| r.name = "B".into()).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateRider("B".into()));
        assert_eq!(reg.name(RiderId(0)), "A");

        assert!(reg.update(RiderId(1), |r| r.abilities.sprint = 150).is_err());
        assert_eq!(reg.get(RiderId(1)).abilities.sprint, 70);
    }
}
