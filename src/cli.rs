use clap::{Parser, Subcommand};
use jobbin::binaries::{JobBinaryReference, ProxyDelegation};
use jobbin::secrets::SecretRef;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobbin")]
#[command(about = "Job binary retrieval CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a job binary reference (update mode when --id is given)
    Validate(ValidateArgs),
    /// Fetch a job binary into a local file
    Fetch(FetchArgs),
    /// Fetch a job binary and stage it onto an execution host
    Stage(StageArgs),
    /// Upload a file as an internal-db job binary
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReferenceArgs {
    /// Job binary URL, e.g. swift://container.sahara/object
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long, default_value = "")]
    pub name: String,
    /// Storage user stored with the job binary
    #[arg(long)]
    pub user: Option<String>,
    /// Secret reference holding the user's password
    #[arg(long)]
    pub password_ref: Option<String>,
}

impl ReferenceArgs {
    pub fn to_reference(&self) -> JobBinaryReference {
        let mut reference = JobBinaryReference::new(&self.url).with_name(&self.name);
        reference.id = self.id.clone();
        reference.extra.user = self.user.clone();
        reference.extra.password = self.password_ref.as_deref().map(SecretRef::new);
        reference
    }
}

#[derive(clap::Args, Debug)]
pub struct ProxyArgs {
    #[arg(long, requires_all = ["proxy_password_ref", "proxy_trust_id"])]
    pub proxy_user: Option<String>,
    #[arg(long)]
    pub proxy_password_ref: Option<String>,
    #[arg(long)]
    pub proxy_trust_id: Option<String>,
}

impl ProxyArgs {
    pub fn to_delegation(&self) -> Option<ProxyDelegation> {
        match (&self.proxy_user, &self.proxy_password_ref, &self.proxy_trust_id) {
            (Some(user), Some(password), Some(trust_id)) => Some(ProxyDelegation {
                proxy_username: user.clone(),
                proxy_password: SecretRef::new(password),
                proxy_trust_id: trust_id.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub reference: ReferenceArgs,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub reference: ReferenceArgs,
    #[command(flatten)]
    pub proxy: ProxyArgs,
    /// File to write the job binary to
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    #[command(flatten)]
    pub reference: ReferenceArgs,
    #[command(flatten)]
    pub proxy: ProxyArgs,
    /// Destination directory on the host (defaults to job_binaries.staging_dir)
    #[arg(long)]
    pub dest: Option<String>,
    /// Local directory standing in for the execution host's filesystem
    #[arg(long, default_value = "data/remote")]
    pub remote_root: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    pub file: PathBuf,
}
