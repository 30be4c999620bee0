//! Provides the order in which candidate ports are fingerprinted.
use crate::input::ScanOrder;
use itertools::Itertools;
use rand::seq::SliceRandom;

/// A de-duplicated candidate port list and the order to walk it in.
///
/// Candidate lists may name the same port several times (several frameworks
/// share a default port); every port is kept once, at its first position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortStrategy {
    Serial(Vec<u16>),
    Random(Vec<u16>),
}

impl PortStrategy {
    pub fn pick(ports: &[u16], order: ScanOrder) -> Self {
        let ports: Vec<u16> = ports.iter().copied().unique().collect();
        match order {
            ScanOrder::Serial => PortStrategy::Serial(ports),
            ScanOrder::Random => {
                let mut rng = rand::rng();
                let mut ports = ports;
                ports.shuffle(&mut rng);
                PortStrategy::Random(ports)
            }
        }
    }

    pub fn ordered_iter(&self) -> impl Iterator<Item = u16> + use<'_> {
        match self {
            PortStrategy::Serial(ports) | PortStrategy::Random(ports) => ports.iter().copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PortStrategy::Serial(ports) | PortStrategy::Random(ports) => ports.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
