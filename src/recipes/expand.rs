//! Dependency expansion.
//!
//! Synthesizes derived units from component builders and composite units
//! from the `full` flag and custom image requests. Consumes a [`Discovery`]
//! and returns the complete unit list; nothing is mutated in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;

use crate::core::components::{COMMON, DRIVER, EXECUTOR};
use crate::core::image::LATEST;
use crate::core::unit::DERIVED_TIER;
use crate::core::{
    BuildUnit, ComponentRegistry, DerivedRole, ImagePrefix, LibraryExtensions, PipelineError,
    UnitKind,
};
use crate::recipes::descriptor::CompositeDescriptor;
use crate::recipes::discover::{Discovery, BUILD_LOG};
use crate::util::config::DEFAULT_DESCRIPTOR;

/// Name of the aggregate image requested with `--full`.
pub const FULL: &str = "full";

/// Id of the combined variant of the common component.
pub const COMMON_FULL: &str = "common-full";

/// A user-requested composite image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomImage {
    pub name: String,
    pub components: Vec<String>,
}

impl CustomImage {
    pub fn new(name: impl Into<String>, components: Vec<String>) -> Self {
        CustomImage {
            name: name.into(),
            components,
        }
    }
}

impl FromStr for CustomImage {
    type Err = PipelineError;

    /// Parse `NAME=COMPONENT[,COMPONENT...]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidCustomImage(s.to_string());

        let (name, list) = s.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        let components: Vec<String> = list.split(',').map(|c| c.trim().to_string()).collect();

        if name.is_empty() || components.iter().any(String::is_empty) {
            return Err(invalid());
        }
        Ok(CustomImage::new(name, components))
    }
}

/// Options for the expansion phase.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Also derive images from the common builder
    pub bases: bool,
    /// Prepend the `full` aggregate image
    pub full: bool,
    pub custom_images: Vec<CustomImage>,
    /// Run-wide version, preferred for custom images
    pub version: Option<String>,
    pub prefix: ImagePrefix,
    /// Directory receiving generated build contexts
    pub workspace: PathBuf,
    pub descriptor: String,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            bases: false,
            full: false,
            custom_images: Vec::new(),
            version: None,
            prefix: ImagePrefix::default(),
            workspace: PathBuf::new(),
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
        }
    }
}

/// Expand discovered units into the full build list.
///
/// Returned units keep discovery order, followed by derived units and then
/// composites. Ids are unique across the result.
pub fn expand(discovery: Discovery, options: &ExpandOptions) -> Result<Vec<BuildUnit>> {
    let Discovery { units, libraries } = discovery;
    let registry = ComponentRegistry::from_units(&units);
    let generated = options.workspace.join("generated");

    let mut derived = Vec::new();
    for (name, builder) in registry.iter() {
        if name == COMMON && !options.bases {
            continue;
        }
        let libs = libraries.for_component(name);
        let tier = derived_tier(name, builder, &units);

        for role in [DerivedRole::Driver, DerivedRole::Executor, DerivedRole::Combined] {
            let (id, tier, markers): (String, u32, &[&str]) = match role {
                DerivedRole::Driver => (format!("{}-{}", name, DRIVER), tier, &[DRIVER]),
                DerivedRole::Executor => (format!("{}-{}", name, EXECUTOR), tier, &[EXECUTOR]),
                DerivedRole::Combined => {
                    let id = if name == COMMON { COMMON_FULL } else { name };
                    (id.to_string(), tier + 1, &[DRIVER, EXECUTOR])
                }
            };

            let mut constituents: Vec<String> = markers.iter().map(|m| m.to_string()).collect();
            constituents.push(name.to_string());
            constituents.extend(libs.iter().cloned());

            derived.push(synthesize(
                &generated,
                options,
                SyntheticUnit {
                    id,
                    constituents,
                    version: builder.version.clone(),
                    tier,
                    kind: UnitKind::Derived {
                        component: name.to_string(),
                        role,
                    },
                },
            )?);
        }
    }

    let mut requests = options.custom_images.clone();
    if options.full && registry.has_real_component() {
        let mut components = vec![DRIVER.to_string(), EXECUTOR.to_string()];
        components.extend(registry.names().map(str::to_string));
        requests.insert(0, CustomImage::new(FULL, components));
    }

    let custom_version = options
        .version
        .clone()
        .or_else(|| registry.get(COMMON).map(|u| u.version.clone()))
        .unwrap_or_else(|| LATEST.to_string());

    let mut tier = units
        .iter()
        .chain(derived.iter())
        .map(|u| u.tier)
        .max()
        .unwrap_or(0);

    let mut composites = Vec::with_capacity(requests.len());
    for request in requests {
        tier += 1;
        composites.push(synthesize(
            &generated,
            options,
            SyntheticUnit {
                constituents: with_libraries(&request.components, &libraries),
                id: request.name,
                version: custom_version.clone(),
                tier,
                kind: UnitKind::Composite,
            },
        )?);
    }

    let all: Vec<BuildUnit> = units.into_iter().chain(derived).chain(composites).collect();
    check_unique(&all)?;
    Ok(all)
}

/// Tier of the driver and executor variants of a component.
///
/// At least [`DERIVED_TIER`], and above the builder and every library
/// extension of the component.
fn derived_tier(component: &str, builder: &BuildUnit, units: &[BuildUnit]) -> u32 {
    let highest = units
        .iter()
        .filter(|u| matches!(&u.kind, UnitKind::LibraryExtension { component: c } if c == component))
        .map(|u| u.tier)
        .fold(builder.tier, u32::max);
    DERIVED_TIER.max(highest + 1)
}

/// Listed components followed by their library extensions.
fn with_libraries(components: &[String], libraries: &LibraryExtensions) -> Vec<String> {
    let mut all = components.to_vec();
    for component in components {
        all.extend(libraries.for_component(component).iter().cloned());
    }
    all
}

struct SyntheticUnit {
    id: String,
    constituents: Vec<String>,
    version: String,
    tier: u32,
    kind: UnitKind,
}

/// Write a generated descriptor into its own context directory.
fn synthesize(generated: &Path, options: &ExpandOptions, unit: SyntheticUnit) -> Result<BuildUnit> {
    let context = generated.join(&unit.id);
    let descriptor = CompositeDescriptor::new(&unit.constituents, &options.prefix, &unit.version)
        .write(&context, &options.descriptor)?;

    tracing::debug!("Generated {} from [{}]", unit.id, unit.constituents.join(", "));
    Ok(BuildUnit {
        display_name: options.prefix.display_name(&unit.id),
        id: unit.id,
        log_path: context.join(BUILD_LOG),
        context_path: context,
        descriptor_path: descriptor,
        version: unit.version,
        tier: unit.tier,
        kind: unit.kind,
    })
}

fn check_unique(units: &[BuildUnit]) -> Result<(), PipelineError> {
    let mut seen: BTreeMap<&str, &BuildUnit> = BTreeMap::new();
    for unit in units {
        if let Some(first) = seen.insert(unit.id.as_str(), unit) {
            return Err(PipelineError::DuplicateUnit {
                id: unit.id.clone(),
                first: first.descriptor_path.clone(),
                second: unit.descriptor_path.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SourceOrigin, SourceTree};
    use crate::recipes::discover::{discover, DiscoverOptions};
    use crate::test_support::RecipeTree;
    use tempfile::TempDir;

    fn collect(trees: Vec<(RecipeTree, &str)>) -> Discovery {
        let trees: Vec<SourceTree> = trees
            .into_iter()
            .enumerate()
            .map(|(n, (fixture, version))| {
                let root = fixture.create();
                let id = root.file_name().unwrap().to_string_lossy().into_owned();
                SourceTree::new(id, n, root.clone(), version, SourceOrigin::Local(root))
            })
            .collect();
        discover(&trees, &DiscoverOptions::default()).unwrap()
    }

    fn options(tmp: &TempDir) -> ExpandOptions {
        ExpandOptions {
            workspace: tmp.path().join("ws"),
            ..Default::default()
        }
    }

    fn find<'a>(units: &'a [BuildUnit], id: &str) -> &'a BuildUnit {
        units
            .iter()
            .find(|u| u.id == id)
            .unwrap_or_else(|| panic!("no unit {}", id))
    }

    fn sample(tmp: &TempDir) -> Discovery {
        collect(
            vec![
                (
                    RecipeTree::new(tmp.path().join("common"))
                        .recipe("common/builder", "FROM scratch"),
                    "latest",
                ),
                (
                    RecipeTree::new(tmp.path().join("core-A"))
                        .recipe("core-A/builder", "FROM scratch")
                        .recipe("core-A/lib-foo", "FROM scratch"),
                    "latest",
                ),
            ],
        )
    }

    #[test]
    fn test_expected_units_and_tiers() {
        let tmp = TempDir::new().unwrap();
        let opts = ExpandOptions {
            custom_images: vec!["bundle=core-A".parse().unwrap()],
            ..options(&tmp)
        };
        let units = expand(sample(&tmp), &opts).unwrap();

        let tiers: Vec<(&str, u32)> = units.iter().map(|u| (u.id.as_str(), u.tier)).collect();
        assert_eq!(
            tiers,
            vec![
                ("common-builder", 50),
                ("core-A-builder", 50),
                ("core-A-lib-foo-builder", 200),
                ("core-A-driver", 300),
                ("core-A-executor", 300),
                ("core-A", 301),
                ("bundle", 302),
            ]
        );

        let combined = std::fs::read_to_string(&find(&units, "core-A").descriptor_path).unwrap();
        assert!(combined.contains("COPY --from=ignishpc/core-A-builder:latest"));
        assert!(combined.contains("COPY --from=ignishpc/core-A-lib-foo-builder:latest"));
        assert!(combined.contains("driver-install.sh"));
        assert!(combined.contains("executor-install.sh"));

        let driver = std::fs::read_to_string(&find(&units, "core-A-driver").descriptor_path).unwrap();
        assert!(driver.contains("core-A-lib-foo-builder"));
        assert!(!driver.contains("executor-install.sh"));

        let bundle = find(&units, "bundle");
        assert_eq!(bundle.kind, UnitKind::Composite);
        let text = std::fs::read_to_string(&bundle.descriptor_path).unwrap();
        assert!(text.contains("core-A-builder"));
        assert!(text.contains("core-A-lib-foo-builder"));
        assert!(!text.contains("driver-install.sh"));
    }

    #[test]
    fn test_derived_ordering_property() {
        let tmp = TempDir::new().unwrap();
        let units = expand(sample(&tmp), &options(&tmp)).unwrap();

        let builder = find(&units, "core-A-builder").tier;
        let driver = find(&units, "core-A-driver").tier;
        let executor = find(&units, "core-A-executor").tier;
        let combined = find(&units, "core-A").tier;
        assert!(builder < driver);
        assert_eq!(driver, executor);
        assert!(executor < combined);
    }

    #[test]
    fn test_late_builder_pushes_derived_tier() {
        let tmp = TempDir::new().unwrap();
        let discovery = collect(
            vec![(
                RecipeTree::new(tmp.path().join("cpp"))
                    .ordered_recipe("cpp/builder", "FROM scratch", "450"),
                "latest",
            )],
        );
        let units = expand(discovery, &options(&tmp)).unwrap();
        assert_eq!(find(&units, "cpp-driver").tier, 451);
        assert_eq!(find(&units, "cpp").tier, 452);
    }

    #[test]
    fn test_common_skipped_without_bases() {
        let tmp = TempDir::new().unwrap();
        let units = expand(sample(&tmp), &options(&tmp)).unwrap();
        assert!(!units.iter().any(|u| u.id.starts_with("common-") && u.id != "common-builder"));

        let tmp = TempDir::new().unwrap();
        let opts = ExpandOptions {
            bases: true,
            ..options(&tmp)
        };
        let units = expand(sample(&tmp), &opts).unwrap();
        assert_eq!(find(&units, "common-driver").tier, 300);
        assert_eq!(find(&units, COMMON_FULL).tier, 301);
    }

    #[test]
    fn test_reserved_builders_not_expanded() {
        let tmp = TempDir::new().unwrap();
        let discovery = collect(
            vec![(
                RecipeTree::new(tmp.path().join("common"))
                    .recipe("common/builder", "FROM scratch")
                    .recipe("driver/builder", "FROM scratch")
                    .recipe("executor/builder", "FROM scratch"),
                "latest",
            )],
        );
        let units = expand(discovery, &options(&tmp)).unwrap();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn test_full_requires_real_component() {
        let tmp = TempDir::new().unwrap();
        let discovery = collect(
            vec![(
                RecipeTree::new(tmp.path().join("common"))
                    .recipe("common/builder", "FROM scratch"),
                "latest",
            )],
        );
        let opts = ExpandOptions {
            full: true,
            ..options(&tmp)
        };
        let units = expand(discovery, &opts).unwrap();
        assert!(!units.iter().any(|u| u.id == FULL));
    }

    #[test]
    fn test_full_is_first_composite() {
        let tmp = TempDir::new().unwrap();
        let opts = ExpandOptions {
            full: true,
            custom_images: vec!["mini=core-A".parse().unwrap()],
            ..options(&tmp)
        };
        let units = expand(sample(&tmp), &opts).unwrap();

        let full = find(&units, FULL);
        let mini = find(&units, "mini");
        assert_eq!(full.tier, 302);
        assert_eq!(mini.tier, 303);

        let text = std::fs::read_to_string(&full.descriptor_path).unwrap();
        assert!(text.contains("core-A-builder"));
        assert!(text.contains("core-A-lib-foo-builder"));
        assert!(!text.contains("common-builder"));
        assert!(text.contains("driver-install.sh"));
        assert!(text.contains("executor-install.sh"));
    }

    #[test]
    fn test_custom_version_preference() {
        let tmp = TempDir::new().unwrap();
        let discovery = collect(
            vec![
                (
                    RecipeTree::new(tmp.path().join("common"))
                        .recipe("common/builder", "FROM scratch"),
                    "3.2",
                ),
                (
                    RecipeTree::new(tmp.path().join("core"))
                        .recipe("core/builder", "FROM scratch"),
                    "1.0",
                ),
            ],
        );
        let opts = ExpandOptions {
            custom_images: vec!["x=core".parse().unwrap()],
            ..options(&tmp)
        };
        let units = expand(discovery.clone(), &opts).unwrap();
        assert_eq!(find(&units, "x").version, "3.2");
        assert_eq!(find(&units, "core").version, "1.0");

        let opts = ExpandOptions {
            version: Some("9.9".to_string()),
            ..opts
        };
        let units = expand(discovery, &opts).unwrap();
        assert_eq!(find(&units, "x").version, "9.9");
    }

    #[test]
    fn test_custom_version_falls_back_to_latest() {
        let tmp = TempDir::new().unwrap();
        let discovery = collect(
            vec![(
                RecipeTree::new(tmp.path().join("core"))
                    .recipe("core/builder", "FROM scratch"),
                "1.0",
            )],
        );
        let opts = ExpandOptions {
            custom_images: vec!["x=core".parse().unwrap()],
            ..options(&tmp)
        };
        let units = expand(discovery, &opts).unwrap();
        assert_eq!(find(&units, "x").version, "latest");
    }

    #[test]
    fn test_custom_image_colliding_with_derived() {
        let tmp = TempDir::new().unwrap();
        let opts = ExpandOptions {
            custom_images: vec!["core-A=core-A".parse().unwrap()],
            ..options(&tmp)
        };
        let err = expand(sample(&tmp), &opts).unwrap_err();
        assert!(err.to_string().contains("`core-A` is already defined"));
    }

    #[test]
    fn test_parse_custom_image() {
        let image: CustomImage = "bundle=core-A, python".parse().unwrap();
        assert_eq!(image.name, "bundle");
        assert_eq!(image.components, vec!["core-A", "python"]);

        assert!("bundle".parse::<CustomImage>().is_err());
        assert!("=core".parse::<CustomImage>().is_err());
        assert!("bundle=".parse::<CustomImage>().is_err());
        assert!("bundle=a,,b".parse::<CustomImage>().is_err());
    }
}
