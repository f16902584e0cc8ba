pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod datastore;
pub mod datetime;
pub mod master;
pub mod model;
pub mod render;
pub mod strategy;
pub mod task;
pub mod view;

use std::cell::RefCell;
use std::ffi::OsString;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dayplan CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.dayplanrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let conf_path =
    config::resolve_conf_path(
      &cfg,
      cli.conf.as_deref()
    )
    .context(
      "failed to resolve state file \
       location"
    )?;

  let store =
    datastore::ConfStore::open(
      &conf_path
    )
    .with_context(|| {
      format!(
        "failed to open state file at \
         {}",
        conf_path.display()
      )
    })?;

  let clock =
    datetime::Clock::from_config(
      cfg.get("timezone").as_deref()
    );
  let today = clock.today();
  let date = match cli.date.as_deref() {
    | Some(expr) => {
      datetime::parse_date_expr(
        expr, today
      )?
    }
    | None => today
  };

  let strategy = cfg.strategy()?;
  let include_all =
    cli.all || cfg.include_all();
  debug!(
    strategy = strategy.as_str(),
    include_all,
    date = %date,
    "controller settings"
  );

  let view = Rc::new(RefCell::new(
    view::TerminalView::default()
  ));
  let mut controller =
    controller::TaskController::new(
      store,
      strategy.build(),
      Rc::clone(&view),
      date,
      include_all
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut controller,
    &view,
    &cfg,
    &renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
