//! Build plan: units grouped into tiers.

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::core::BuildUnit;

/// A maximal run of units sharing a tier value.
#[derive(Debug, Clone, Serialize)]
pub struct Tier {
    pub order: u32,
    pub units: Vec<BuildUnit>,
}

/// Units in scheduling order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildPlan {
    tiers: Vec<Tier>,
}

impl BuildPlan {
    /// Stable-sort units by tier and group equal tiers.
    ///
    /// Units of one tier keep their input order.
    pub fn new(mut units: Vec<BuildUnit>) -> Self {
        units.sort_by_key(|u| u.tier);

        let mut tiers: Vec<Tier> = Vec::new();
        for unit in units {
            match tiers.last_mut() {
                Some(tier) if tier.order == unit.tier => tier.units.push(unit),
                _ => tiers.push(Tier {
                    order: unit.tier,
                    units: vec![unit],
                }),
            }
        }
        BuildPlan { tiers }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// All units in scheduling order.
    pub fn units(&self) -> impl Iterator<Item = &BuildUnit> {
        self.tiers.iter().flat_map(|t| t.units.iter())
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(|t| t.units.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tier in &self.tiers {
            writeln!(f, "  ---({})---", tier.order)?;
            for unit in &tier.units {
                writeln!(f, "  {}", unit.tag())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UnitKind;
    use crate::test_support::unit_at;
    use std::path::Path;

    #[test]
    fn test_grouping_is_stable() {
        let base = Path::new("/ws");
        let plan = BuildPlan::new(vec![
            unit_at(base, "b", 100, UnitKind::Plain),
            unit_at(base, "a-builder", 50, UnitKind::Builder),
            unit_at(base, "c", 100, UnitKind::Plain),
            unit_at(base, "z-builder", 50, UnitKind::Builder),
        ]);

        let orders: Vec<u32> = plan.tiers().iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![50, 100]);
        let ids: Vec<&str> = plan.units().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a-builder", "z-builder", "b", "c"]);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_display() {
        let base = Path::new("/ws");
        let plan = BuildPlan::new(vec![
            unit_at(base, "a-builder", 50, UnitKind::Builder),
            unit_at(base, "a", 301, UnitKind::Composite),
        ]);
        assert_eq!(
            plan.to_string(),
            "  ---(50)---\n  ignishpc/a-builder:latest\n  ---(301)---\n  ignishpc/a:latest\n"
        );
    }

    #[test]
    fn test_json() {
        let base = Path::new("/ws");
        let plan = BuildPlan::new(vec![unit_at(base, "a-builder", 50, UnitKind::Builder)]);
        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["tiers"][0]["order"], 50);
        assert_eq!(json["tiers"][0]["units"][0]["id"], "a-builder");
        assert_eq!(json["tiers"][0]["units"][0]["kind"], "builder");
    }

    #[test]
    fn test_empty_plan() {
        let plan = BuildPlan::new(Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "");
    }
}
