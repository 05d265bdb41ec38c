//! Import graph flattening.
//!
//! Every transitively imported file is pulled into one [`SourceUnit`] keyed by short logical
//! names, and each import statement is rewritten to point at the logical name of its target. The
//! walk is depth-first and sequential; each canonical path is scanned and loaded at most once, so
//! diamonds share a single entry and cycles terminate.

mod loader;
mod scanner;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::internal::errors::Result;
use crate::internal::path::PathResolver;
pub use loader::{FsSourceLoader, SourceLoader};
pub use scanner::{rewrite_specifiers, scan_imports, ImportScan, ImportStatement};

/// Logical filename → source text. Ordered so flattened output diffs cleanly.
pub type SourceUnit = BTreeMap<String, String>;

pub struct ImportGraphResolver<'a> {
  paths: &'a PathResolver,
  loader: &'a dyn SourceLoader,
}

impl<'a> ImportGraphResolver<'a> {
  pub fn new(paths: &'a PathResolver, loader: &'a dyn SourceLoader) -> Self {
    Self { paths, loader }
  }

  /// Flatten `entry` into a self-contained unit.
  ///
  /// Entry keys are resolved against `origin` (or the working root) so that an import which points
  /// back at an entry reuses the entry's key and in-memory content.
  pub fn flatten(&self, entry: SourceUnit, origin: Option<&Path>) -> Result<SourceUnit> {
    let mut graph = Graph::default();
    let entries: Vec<(String, PathBuf, String)> = entry
      .into_iter()
      .map(|(name, content)| {
        let canonical = self.paths.resolve(&name, origin);
        (name, canonical, content)
      })
      .collect();

    for (name, canonical, content) in &entries {
      graph.claim(name, canonical);
      graph
        .inline
        .entry(canonical.clone())
        .or_insert_with(|| content.clone());
    }

    let mut aliases = Vec::new();
    for (name, canonical, content) in entries {
      if graph.visited.contains(&canonical) {
        if !graph.output.contains_key(&name) {
          aliases.push((name, canonical));
        }
        continue;
      }
      self.visit(&mut graph, name, canonical, content)?;
    }

    // Two entry keys that name the same file both stay addressable.
    for (name, canonical) in aliases {
      let body = graph
        .names
        .get(&canonical)
        .and_then(|owner| graph.output.get(owner))
        .cloned();
      if let Some(body) = body {
        graph.output.insert(name, body);
      }
    }

    debug!(files = graph.output.len(), "flattened import graph");
    Ok(graph.output)
  }

  fn visit(
    &self,
    graph: &mut Graph,
    name: String,
    canonical: PathBuf,
    content: String,
  ) -> Result<()> {
    if !graph.visited.insert(canonical.clone()) {
      return Ok(());
    }

    let scan = scan_imports(&content);
    for range in &scan.unsupported {
      let statement = content[range.clone()].lines().next().unwrap_or_default();
      warn!(file = %name, statement, "leaving import that is not a single-line form untouched");
    }

    let mut targets = Vec::with_capacity(scan.imports.len());
    for statement in &scan.imports {
      let target = self.paths.resolve(&statement.specifier, Some(&canonical));
      let logical = graph.logical_name(&target);
      debug!(
        file = %name,
        specifier = %statement.specifier,
        target = %target.display(),
        logical = %logical,
        "resolved import"
      );

      if !graph.visited.contains(&target) {
        let body = match graph.inline.get(&target) {
          Some(body) => body.clone(),
          None => self.loader.load(&target)?,
        };
        self.visit(graph, logical.clone(), target, body)?;
      }
      targets.push(logical);
    }

    let mut renamed = targets.into_iter();
    let rewritten = rewrite_specifiers(&content, &scan.imports, |statement| {
      renamed
        .next()
        .unwrap_or_else(|| statement.specifier.clone())
    });
    graph.output.entry(name).or_insert(rewritten);
    Ok(())
  }
}

#[derive(Default)]
struct Graph {
  /// canonical path → logical name
  names: HashMap<PathBuf, String>,
  /// logical name → canonical path that owns it
  owners: HashMap<String, PathBuf>,
  inline: HashMap<PathBuf, String>,
  visited: HashSet<PathBuf>,
  output: SourceUnit,
}

impl Graph {
  fn claim(&mut self, name: &str, canonical: &Path) {
    self
      .names
      .entry(canonical.to_path_buf())
      .or_insert_with(|| name.to_string());
    self
      .owners
      .entry(name.to_string())
      .or_insert_with(|| canonical.to_path_buf());
  }

  fn logical_name(&mut self, canonical: &Path) -> String {
    if let Some(name) = self.names.get(canonical) {
      return name.clone();
    }
    let name = self.unique_name(canonical);
    self.claim(&name, canonical);
    name
  }

  /// Base name first; on collision qualify with parent directories (`b_Token.sol`,
  /// `a_b_Token.sol`), then fall back to a numeric suffix.
  fn unique_name(&self, canonical: &Path) -> String {
    let components: Vec<String> = canonical
      .components()
      .filter_map(|component| match component {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
      })
      .collect();

    for depth in 1..=components.len() {
      let candidate = components[components.len() - depth..].join("_");
      if !self.owners.contains_key(&candidate) {
        return candidate;
      }
    }

    let base = components.last().cloned().unwrap_or_default();
    let (stem, extension) = match base.rsplit_once('.') {
      Some((stem, extension)) => (stem.to_string(), format!(".{extension}")),
      None => (base.clone(), String::new()),
    };
    (1..)
      .map(|counter| format!("{stem}_{counter}{extension}"))
      .find(|candidate| !self.owners.contains_key(candidate))
      .unwrap_or(base)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::internal::errors::Error;
  use crate::internal::path::canonicalize_path;
  use foundry_compilers::artifacts::remappings::Remapping;
  use std::str::FromStr;
  use std::sync::Mutex;

  struct Fixture {
    _temp: tempfile::TempDir,
    root: PathBuf,
  }

  impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
      let temp = tempfile::tempdir().expect("tempdir");
      let root = canonicalize_path(temp.path());
      for (path, contents) in files {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).expect("dirs");
        std::fs::write(&full, contents).expect("write");
      }
      Self { _temp: temp, root }
    }

    fn resolver(&self) -> PathResolver {
      PathResolver::new(&self.root, Vec::new())
    }
  }

  /// Counts reads per path so tests can check each file is loaded once.
  #[derive(Default)]
  struct CountingLoader {
    reads: Mutex<HashMap<PathBuf, usize>>,
  }

  impl SourceLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<String> {
      *self
        .reads
        .lock()
        .unwrap()
        .entry(path.to_path_buf())
        .or_default() += 1;
      FsSourceLoader.load(path)
    }
  }

  fn unit(entries: &[(&str, &str)]) -> SourceUnit {
    entries
      .iter()
      .map(|(name, content)| (name.to_string(), content.to_string()))
      .collect()
  }

  fn assert_no_dangling_imports(flat: &SourceUnit) {
    for (name, content) in flat {
      for statement in scan_imports(content).imports {
        assert!(
          flat.contains_key(&statement.specifier),
          "{name} imports {} which is not in the unit",
          statement.specifier
        );
      }
    }
  }

  #[test]
  fn already_flat_units_are_returned_unchanged() {
    let fixture = Fixture::new(&[]);
    let paths = fixture.resolver();
    let input = unit(&[
      ("A.sol", "contract A {}"),
      ("B.sol", "// import \"./Nope.sol\";\ncontract B {}"),
    ]);
    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(input.clone(), None)
      .expect("flatten");
    assert_eq!(flat, input);
  }

  #[test]
  fn diamond_imports_share_one_entry() {
    let fixture = Fixture::new(&[
      ("contracts/A.sol", "import \"./lib/C.sol\";\ncontract A {}"),
      ("contracts/B.sol", "import {C} from \"./lib/C.sol\";\ncontract B {}"),
      ("contracts/lib/C.sol", "contract C {}"),
    ]);
    let paths = fixture.resolver();
    let loader = CountingLoader::default();
    let entry = unit(&[(
      "Main.sol",
      "import \"./A.sol\";\nimport \"./B.sol\";\ncontract Main {}",
    )]);
    let origin = fixture.root.join("contracts/Main.sol");

    let flat = ImportGraphResolver::new(&paths, &loader)
      .flatten(entry, Some(&origin))
      .expect("flatten");

    assert_eq!(
      flat.keys().map(String::as_str).collect::<Vec<_>>(),
      vec!["A.sol", "B.sol", "C.sol", "Main.sol"]
    );
    assert_eq!(flat["A.sol"], "import \"C.sol\";\ncontract A {}");
    assert_eq!(flat["B.sol"], "import {C} from \"C.sol\";\ncontract B {}");
    assert_eq!(flat["C.sol"], "contract C {}");
    let reads = loader.reads.lock().unwrap();
    assert_eq!(reads[&fixture.root.join("contracts/lib/C.sol")], 1);
    assert_no_dangling_imports(&flat);
  }

  #[test]
  fn nested_imports_resolve_relative_to_their_own_file() {
    let fixture = Fixture::new(&[
      ("src/a/A.sol", "import \"./b/B.sol\";\ncontract A {}"),
      ("src/a/b/B.sol", "import \"../../shared/S.sol\";\ncontract B {}"),
      ("src/shared/S.sol", "contract S {}"),
    ]);
    let paths = fixture.resolver();
    let entry = unit(&[("src/Main.sol", "import \"./a/A.sol\";\ncontract Main {}")]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect("flatten");

    assert_eq!(flat["src/Main.sol"], "import \"A.sol\";\ncontract Main {}");
    assert_eq!(flat["A.sol"], "import \"B.sol\";\ncontract A {}");
    assert_eq!(flat["B.sol"], "import \"S.sol\";\ncontract B {}");
    assert_no_dangling_imports(&flat);
  }

  #[test]
  fn direct_cycle_terminates_with_two_entries() {
    let fixture = Fixture::new(&[
      ("Entry.sol", "import \"./A.sol\";\ncontract Entry {}"),
      ("A.sol", "import \"./Entry.sol\";\ncontract A {}"),
    ]);
    let paths = fixture.resolver();
    let entry_path = fixture.root.join("Entry.sol");
    let entry = unit(&[(
      "Entry.sol",
      &std::fs::read_to_string(&entry_path).expect("read"),
    )]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, Some(&entry_path))
      .expect("flatten");

    assert_eq!(flat.len(), 2);
    assert_eq!(flat["A.sol"], "import \"Entry.sol\";\ncontract A {}");
    assert_eq!(flat["Entry.sol"], "import \"A.sol\";\ncontract Entry {}");
  }

  #[test]
  fn inline_entries_referenced_by_imports_are_not_read_from_disk() {
    let fixture = Fixture::new(&[]);
    let paths = fixture.resolver();
    let entry = unit(&[
      ("A.sol", "import \"./B.sol\";\ncontract A {}"),
      ("B.sol", "import \"./A.sol\";\ncontract B {}"),
    ]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect("flatten");

    assert_eq!(flat.len(), 2);
    assert_eq!(flat["A.sol"], "import \"B.sol\";\ncontract A {}");
    assert_eq!(flat["B.sol"], "import \"A.sol\";\ncontract B {}");
  }

  #[test]
  fn aliased_imports_resolve_through_remappings() {
    let fixture = Fixture::new(&[
      ("vendor/foo/Bar.sol", "import \"./Baz.sol\";\ncontract Bar {}"),
      ("vendor/foo/Baz.sol", "contract Baz {}"),
    ]);
    let paths = PathResolver::new(
      &fixture.root,
      vec![Remapping::from_str("@pkg/foo/=vendor/foo/").expect("remapping")],
    );
    let entry = unit(&[(
      "contracts/deep/Main.sol",
      "import {Bar} from \"@pkg/foo/Bar.sol\";\ncontract Main {}",
    )]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect("flatten");

    assert_eq!(
      flat["contracts/deep/Main.sol"],
      "import {Bar} from \"Bar.sol\";\ncontract Main {}"
    );
    assert_eq!(flat["Bar.sol"], "import \"Baz.sol\";\ncontract Bar {}");
    assert!(flat.contains_key("Baz.sol"));
  }

  #[test]
  fn missing_imports_fail_with_not_found() {
    let fixture = Fixture::new(&[("A.sol", "import \"./Missing.sol\";\ncontract A {}")]);
    let paths = fixture.resolver();
    let entry = unit(&[("Main.sol", "import \"./A.sol\";\ncontract Main {}")]);

    let error = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect_err("missing import");

    match error {
      Error::NotFound { path } => assert_eq!(path, fixture.root.join("Missing.sol")),
      other => panic!("expected NotFound, got {other:?}"),
    }
  }

  #[test]
  fn same_base_name_in_different_directories_is_qualified() {
    let fixture = Fixture::new(&[
      ("a/Token.sol", "contract TokenA {}"),
      ("b/Token.sol", "contract TokenB {}"),
    ]);
    let paths = fixture.resolver();
    let entry = unit(&[(
      "Main.sol",
      "import \"./a/Token.sol\";\nimport \"./b/Token.sol\";\ncontract Main {}",
    )]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect("flatten");

    assert_eq!(flat["Token.sol"], "contract TokenA {}");
    assert_eq!(flat["b_Token.sol"], "contract TokenB {}");
    assert_eq!(
      flat["Main.sol"],
      "import \"Token.sol\";\nimport \"b_Token.sol\";\ncontract Main {}"
    );
    assert_no_dangling_imports(&flat);
  }

  #[test]
  fn imported_file_cannot_take_an_entry_name() {
    let fixture = Fixture::new(&[("lib/Main.sol", "contract Other {}")]);
    let paths = fixture.resolver();
    let entry = unit(&[("Main.sol", "import \"./lib/Main.sol\";\ncontract Main {}")]);

    let flat = ImportGraphResolver::new(&paths, &FsSourceLoader)
      .flatten(entry, None)
      .expect("flatten");

    assert_eq!(flat["lib_Main.sol"], "contract Other {}");
    assert_eq!(flat["Main.sol"], "import \"lib_Main.sol\";\ncontract Main {}");
  }
}
