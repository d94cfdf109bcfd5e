//! Configuration layering and capability wiring.
//!
//! Precedence, lowest first: [`PreserveConfig::default`] → `--config` YAML →
//! environment variables → flags (clap resolves the last two).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use preserve_collector::{BuiltinJsonQuery, CommandStateQuery, JqQuery, JsonQuery, StateQuery};
use preserve_core::PreserveConfig;
use preserve_pipeline::Orchestrator;
use preserve_remote::S3ObjectStore;

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// YAML config file; flags and environment override its values.
    #[arg(long, global = true, env = "PRESERVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest with a `preserved_files` array [default: harness.json].
    #[arg(long, global = true, env = "PRESERVE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Infra tool used for `<bin> show -json` [default: terraform].
    #[arg(long, global = true, env = "PRESERVE_STATE_BIN")]
    pub state_bin: Option<String>,

    /// Directory the state query runs in.
    #[arg(long, global = true, env = "PRESERVE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Skip the infra-state query; only the manifest is read.
    #[arg(long, global = true)]
    pub no_state_query: bool,

    /// External jq-compatible binary; built-in JSON parsing when unset.
    #[arg(long, global = true, env = "PRESERVE_JQ")]
    pub jq: Option<String>,

    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// S3-compatible endpoint (MinIO, localstack).
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Exact `[s3://]bucket/key` of the archive.
    #[arg(long, global = true, env = "PRESERVED_FILES_LOCATION")]
    pub location: Option<String>,

    /// Plan identifier (`[s3://]bucket/path/id.plan`) the archive key is derived from.
    #[arg(long, global = true, env = "PRESERVE_PLAN_LOCATION")]
    pub plan_location: Option<String>,

    /// SHA-256 the pulled archive must match.
    #[arg(long, global = true, env = "PRESERVED_FILES_SHA256")]
    pub expected_sha256: Option<String>,

    /// Sourceable file written after push [default: preserve.env].
    #[arg(long, global = true, env = "PRESERVE_HANDOFF")]
    pub handoff: Option<PathBuf>,

    /// Directory pulled files are restored under [default: .].
    #[arg(long, global = true, env = "PRESERVE_EXTRACT_ROOT")]
    pub extract_root: Option<PathBuf>,

    /// Archive entry prefix restored at `/` instead of under the extract root.
    #[arg(
        long = "restore-absolute-prefix",
        global = true,
        env = "PRESERVE_RESTORE_ABSOLUTE_PREFIXES",
        value_delimiter = ','
    )]
    pub restore_absolute_prefixes: Vec<String>,

    #[arg(long, global = true, env = "PRESERVE_COMMIT_ID")]
    pub commit_id: Option<String>,

    /// Environment label used in tags.
    #[arg(long, global = true, env = "PRESERVE_ENVIRONMENT")]
    pub environment: Option<String>,

    #[arg(long, global = true, env = "PRESERVE_BUSINESS_UNIT")]
    pub business_unit: Option<String>,

    #[arg(long, global = true, env = "PRESERVE_PRODUCT")]
    pub product: Option<String>,

    #[arg(long, global = true, env = "PRESERVE_OWNER")]
    pub owner: Option<String>,
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn overlay_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl SettingsArgs {
    /// Builds the run's single [`PreserveConfig`].
    pub fn load(&self) -> Result<PreserveConfig> {
        let mut config = match &self.config {
            Some(path) => PreserveConfig::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PreserveConfig::default(),
        };

        overlay(&mut config.manifest_path, self.manifest.clone());
        overlay(&mut config.state_query_bin, self.state_bin.clone());
        overlay_opt(&mut config.state_query_dir, self.state_dir.clone());
        overlay_opt(&mut config.json_query_bin, self.jq.clone());
        overlay(&mut config.region, self.region.clone());
        overlay_opt(&mut config.endpoint_url, self.endpoint_url.clone());
        overlay_opt(&mut config.explicit_location, self.location.clone());
        overlay_opt(&mut config.plan_location, self.plan_location.clone());
        overlay_opt(&mut config.expected_digest, self.expected_sha256.clone());
        overlay(&mut config.handoff_path, self.handoff.clone());
        overlay(&mut config.extract_root, self.extract_root.clone());
        if !self.restore_absolute_prefixes.is_empty() {
            config.restore_absolute_prefixes = self.restore_absolute_prefixes.clone();
        }

        let tagging = &mut config.tagging;
        overlay_opt(&mut tagging.commit_id, self.commit_id.clone());
        overlay_opt(&mut tagging.environment, self.environment.clone());
        overlay_opt(&mut tagging.business_unit, self.business_unit.clone());
        overlay_opt(&mut tagging.product, self.product.clone());
        overlay_opt(&mut tagging.owner, self.owner.clone());

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Concrete JSON query, state query and object store for one invocation.
pub struct Capabilities {
    json: Box<dyn JsonQuery>,
    state: Option<CommandStateQuery>,
    store: S3ObjectStore,
}

impl Capabilities {
    pub fn new(config: &PreserveConfig, settings: &SettingsArgs) -> Result<Self> {
        let json: Box<dyn JsonQuery> = match &config.json_query_bin {
            Some(bin) => Box::new(JqQuery::new(bin.clone())),
            None => Box::new(BuiltinJsonQuery),
        };
        let state = (!settings.no_state_query).then(|| {
            CommandStateQuery::new(config.state_query_bin.clone(), config.state_query_dir.clone())
        });
        let store = S3ObjectStore::new(&config.region, config.endpoint_url.as_deref())
            .context("failed to initialise object storage client")?;
        Ok(Self { json, state, store })
    }

    /// Orchestrator rooted at the current directory.
    pub fn orchestrator<'a>(&'a self, config: &'a PreserveConfig) -> Result<Orchestrator<'a>> {
        let workdir = std::env::current_dir().context("could not determine current directory")?;
        Ok(Orchestrator::new(
            config,
            self.json.as_ref(),
            self.state.as_ref().map(|s| s as &dyn StateQuery),
            &self.store,
            workdir,
        ))
    }
}
