use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::strategy::StrategyKind;

pub const RC_ENV_VAR: &str =
  "DAYPLANRC";
const RC_FILE_NAME: &str =
  ".dayplanrc";
const DEFAULT_CONF_LOCATION: &str =
  "~/.dayplan/init.conf";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self::defaults()
  }
}

impl Config {
  /// Built-in settings, before any
  /// rc file or override.
  #[must_use]
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in [
      (
        "conf.location",
        DEFAULT_CONF_LOCATION
      ),
      ("add.strategy", "simple"),
      ("master.include_all", "off"),
      ("default.command", "list"),
      ("color", "on")
    ] {
      cfg.map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading dayplanrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no dayplanrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn strategy(
    &self
  ) -> anyhow::Result<StrategyKind> {
    self
      .get("add.strategy")
      .map(|raw| raw.parse::<StrategyKind>())
      .transpose()
      .map(Option::unwrap_or_default)
  }

  pub fn include_all(&self) -> bool {
    self
      .get_bool("master.include_all")
      .unwrap_or(false)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line_no = idx + 1;
      match parse_rc_line(raw_line)
        .with_context(|| {
          format!(
            "{}:{line_no}",
            path.display()
          )
        })? {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          self.include_file(
            &path, &base_dir, target,
            line_no
          )?;
        }
        | RcLine::Setting(key, value) => {
          trace!(key, value, line = line_no, "rc setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
      }
    }

    Ok(())
  }

  fn include_file(
    &mut self,
    from: &Path,
    base_dir: &Path,
    target: &str,
    line_no: usize
  ) -> anyhow::Result<()> {
    let include_path =
      resolve_include_path(
        base_dir, target
      )?;
    debug!(
      file = %from.display(),
      include = %include_path.display(),
      line = line_no,
      "processing include"
    );

    if include_path == from
      || self
        .loaded_files
        .contains(&include_path)
    {
      warn!(include = %include_path.display(), "rc file already loaded; skipping include cycle");
      return Ok(());
    }
    if !include_path.exists() {
      warn!(include = %include_path.display(), "include file does not exist; skipping");
      return Ok(());
    }
    self.load_file(&include_path)
  }
}

/// One meaningful line of a
/// dayplanrc file.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

/// `#` starts a comment anywhere on
/// the line.
fn parse_rc_line(
  raw: &str
) -> anyhow::Result<RcLine<'_>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();

  if line.is_empty() {
    return Ok(RcLine::Blank);
  }
  if let Some(target) =
    line.strip_prefix("include ")
  {
    return Ok(RcLine::Include(
      target.trim()
    ));
  }

  let (key, value) = line
    .split_once('=')
    .ok_or_else(|| {
      anyhow!(
        "expected `key = value` or \
         `include <path>`, got: {raw}"
      )
    })?;
  let key = key.trim();
  if key.is_empty() {
    return Err(anyhow!(
      "missing key before `=`: {raw}"
    ));
  }
  Ok(RcLine::Setting(key, value.trim()))
}

/// Location of the JSON state file:
/// `--conf`, then `conf.location`.
#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_conf_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(expand_tilde(path));
  }

  let raw = cfg
    .get("conf.location")
    .unwrap_or_else(|| {
      DEFAULT_CONF_LOCATION.to_string()
    });
  if raw.trim().is_empty() {
    return Err(anyhow!(
      "conf.location cannot be empty"
    ));
  }
  Ok(expand_tilde(Path::new(
    raw.trim()
  )))
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping \
       dayplanrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::Path;

  use tempfile::tempdir;

  use super::{
    Config,
    RcLine,
    parse_rc_line,
    resolve_conf_path
  };
  use crate::strategy::StrategyKind;

  #[test]
  fn defaults_are_simple_and_filtered() {
    let cfg = Config::defaults();
    assert_eq!(
      cfg.strategy().expect("strategy"),
      StrategyKind::Simple
    );
    assert!(!cfg.include_all());
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("list")
    );
  }

  #[test]
  fn rc_file_with_include_and_comments()
  {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "master.include_all = yes\n"
    )
    .expect("write include");
    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "# planner settings\n\
       add.strategy = unique  # no dupes\n\
       include extra.rc\n\
       include missing.rc\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&rc))
      .expect("load rc");
    assert_eq!(
      cfg.strategy().expect("strategy"),
      StrategyKind::Unique
    );
    assert!(cfg.include_all());
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn include_cycle_loads_each_file_once()
  {
    let temp =
      tempdir().expect("tempdir");
    let a = temp.path().join("a.rc");
    let b = temp.path().join("b.rc");
    fs::write(
      &a,
      "color = off\ninclude b.rc\n"
    )
    .expect("write a");
    fs::write(
      &b,
      "add.strategy = unique\ninclude a.rc\n"
    )
    .expect("write b");

    let cfg = Config::load(Some(&a))
      .expect("load rc");
    assert_eq!(
      cfg.loaded_files,
      vec![a.clone(), b.clone()]
    );
    assert_eq!(
      cfg.strategy().expect("strategy"),
      StrategyKind::Unique
    );
    assert_eq!(
      cfg.get("color").as_deref(),
      Some("off")
    );
  }

  #[test]
  fn malformed_rc_line_is_an_error() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "just words\n")
      .expect("write rc");
    assert!(Config::load(Some(&rc)).is_err());
  }

  #[test]
  fn overrides_win_and_bad_strategy_errors()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "rc.add.strategy".to_string(),
        "bogus".to_string()
      ),
      (
        "conf.location".to_string(),
        "/tmp/plan.json".to_string()
      ),
    ]);
    assert!(cfg.strategy().is_err());
    assert_eq!(
      resolve_conf_path(&cfg, None)
        .expect("conf path"),
      Path::new("/tmp/plan.json")
    );
    assert_eq!(
      resolve_conf_path(
        &cfg,
        Some(Path::new("other.json"))
      )
      .expect("override"),
      Path::new("other.json")
    );
  }

  #[test]
  fn rc_lines_are_classified() {
    assert_eq!(
      parse_rc_line("  # only a comment")
        .expect("blank"),
      RcLine::Blank
    );
    assert_eq!(
      parse_rc_line("include ~/more.rc")
        .expect("include"),
      RcLine::Include("~/more.rc")
    );
    assert_eq!(
      parse_rc_line(
        "timezone = Europe/Berlin # cet"
      )
      .expect("setting"),
      RcLine::Setting(
        "timezone",
        "Europe/Berlin"
      )
    );
    assert!(parse_rc_line("= on").is_err());
  }
}
