use std::path::{Component, Path, PathBuf};

use foundry_compilers::artifacts::remappings::Remapping;
use tracing::debug;

/// Canonicalises a path while falling back to a lexically normalised absolute path if
/// canonicalisation fails.
///
/// Missing paths still resolve to a stable location relative to the current working directory so
/// the loader can report exactly which file was attempted.
pub fn canonicalize_path(path: &Path) -> PathBuf {
  match std::fs::canonicalize(path) {
    Ok(canonical) => canonical,
    Err(_) => {
      if path.is_absolute() {
        normalize_lexically(path)
      } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        normalize_lexically(&cwd.join(path))
      }
    }
  }
}

/// Canonicalises `path` relative to `base`, returning the best-effort absolute path.
pub fn canonicalize_with_base(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    return canonicalize_path(path);
  }
  canonicalize_path(&normalize_lexically(&base.join(path)))
}

/// Removes `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !normalized.pop() {
          normalized.push(component.as_os_str());
        }
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

/// Turns import specifiers into canonical filesystem paths.
///
/// Remappings are consulted first (longest prefix wins), then the directory of the importing file,
/// then the working root.
#[derive(Debug, Clone)]
pub struct PathResolver {
  root: PathBuf,
  remappings: Vec<Remapping>,
}

impl PathResolver {
  pub fn new(root: impl AsRef<Path>, remappings: Vec<Remapping>) -> Self {
    Self {
      root: canonicalize_path(root.as_ref()),
      remappings,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn remappings(&self) -> &[Remapping] {
    &self.remappings
  }

  pub fn resolve(&self, specifier: &str, importing_file: Option<&Path>) -> PathBuf {
    if let Some((remapping, remainder)) = self.find_remapping(specifier, importing_file) {
      let target = canonicalize_with_base(&self.root, Path::new(&remapping.path));
      let resolved = canonicalize_with_base(&target, Path::new(remainder));
      debug!(
        specifier,
        remapping = %remapping.name,
        resolved = %resolved.display(),
        "resolved import through remapping"
      );
      return resolved;
    }

    match importing_file {
      Some(importer) => {
        let base = importer.parent().unwrap_or(&self.root);
        canonicalize_with_base(base, Path::new(specifier))
      }
      None => {
        let resolved = canonicalize_with_base(&self.root, Path::new(specifier));
        debug!(
          specifier,
          root = %self.root.display(),
          "no importing file for specifier, resolving against the working root"
        );
        resolved
      }
    }
  }

  fn find_remapping<'a, 's>(
    &'a self,
    specifier: &'s str,
    importing_file: Option<&Path>,
  ) -> Option<(&'a Remapping, &'s str)> {
    self
      .remappings
      .iter()
      .filter(|remapping| !remapping.name.is_empty() && specifier.starts_with(&remapping.name))
      .filter(|remapping| self.context_applies(remapping, importing_file))
      .max_by_key(|remapping| remapping.name.len())
      .map(|remapping| {
        let remainder = specifier[remapping.name.len()..].trim_start_matches('/');
        (remapping, remainder)
      })
  }

  fn context_applies(&self, remapping: &Remapping, importing_file: Option<&Path>) -> bool {
    let Some(context) = remapping.context.as_deref().filter(|ctx| !ctx.is_empty()) else {
      return true;
    };
    let Some(importer) = importing_file else {
      return false;
    };
    let relative = importer.strip_prefix(&self.root).unwrap_or(importer);
    relative.starts_with(context.trim_end_matches('/'))
  }
}
