use std::collections::HashMap;

use super::{RiderId, RiderRegistry};

/// Riders grouped by club, in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClubIndex {
    club_of: Vec<usize>,
    members: Vec<Vec<RiderId>>,
    names: Vec<String>,
}

impl ClubIndex {
    pub fn new(registry: &RiderRegistry) -> Self {
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        let mut club_of = Vec::with_capacity(registry.len());
        let mut members: Vec<Vec<RiderId>> = Vec::new();
        let mut names = Vec::new();
        for (id, rider) in registry.iter() {
            let club = *lookup.entry(rider.team.as_str()).or_insert_with(|| {
                names.push(rider.team.clone());
                members.push(Vec::new());
                names.len() - 1
            });
            club_of.push(club);
            members[club].push(id);
        }
        Self {
            club_of,
            members,
            names,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Club index of a rider.
    pub fn club_of(&self, rider: RiderId) -> usize {
        self.club_of[rider.0]
    }

    /// Everyone in `rider`'s club, `rider` included.
    pub fn teammates(&self, rider: RiderId) -> &[RiderId] {
        &self.members[self.club_of[rider.0]]
    }

    pub fn members(&self, club: usize) -> &[RiderId] {
        &self.members[club]
    }

    pub fn name(&self, club: usize) -> &str {
        &self.names[club]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
