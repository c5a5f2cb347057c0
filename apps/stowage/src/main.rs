//! Command-line manager for compartment-scoped Object Storage buckets.
//!
//! Commands that carry a compartment name resolve their credential
//! environment from the name; the rest use `--env` (or the first registered
//! environment). Signing credentials come from the `OCI_*` variables read by
//! `CredentialRegistry::from_env` and `StorageConfig::from_env`.
//!
//! # Usage
//!
//! ```text
//! stowage create-bucket team-logs --compartment cp-dev-team
//! stowage upload team-logs ./report.csv --env dev
//! stowage list-objects team-logs --env dev
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stowage_auth::{CredentialRegistry, Environment};
use stowage_client::{ObjectStorageClient, StorageConfig, is_compartment_ocid};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "stowage",
    about = "Manage compartment-scoped Object Storage buckets",
    version
)]
struct Cli {
    /// Credential environment (dev or prd) for commands without a
    /// classifiable compartment name.
    #[clap(long, global = true, env = "STOWAGE_ENV")]
    env: Option<Environment>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Object Storage namespace.
    Namespace,
    /// List buckets in a compartment.
    ListBuckets {
        /// Compartment name or OCID. Defaults to the configured fallback.
        #[clap(long)]
        compartment: Option<String>,
    },
    /// Create a bucket in a compartment.
    CreateBucket {
        /// Bucket name.
        name: String,
        /// Compartment name or OCID.
        #[clap(long)]
        compartment: String,
    },
    /// Upload a file to a bucket.
    Upload {
        /// Target bucket.
        bucket: String,
        /// File to upload.
        file: PathBuf,
        /// Object name, defaults to the file name.
        object_name: Option<String>,
    },
    /// List objects in a bucket.
    ListObjects {
        /// Bucket to list.
        bucket: String,
    },
    /// Delete one object from a bucket.
    DeleteObject {
        /// Bucket holding the object.
        bucket: String,
        /// Object name, slashes included.
        object: String,
    },
    /// Delete an empty bucket.
    DeleteBucket {
        /// Bucket to delete.
        bucket: String,
    },
}

/// Initialize tracing to stderr, keeping stdout for command output.
fn init_tracing() -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_owned());
        EnvFilter::try_new(&level).with_context(|| format!("invalid log level filter: {level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// The `--env` flag, or the first environment with registered credentials.
fn select_environment(
    client: &ObjectStorageClient,
    flag: Option<Environment>,
) -> Result<Environment> {
    if let Some(environment) = flag {
        return Ok(environment);
    }
    let environment = client
        .registry()
        .environments()
        .next()
        .context("no credential environment configured; pass --env or set the OCI_* variables")?;
    debug!(%environment, "defaulted to first registered environment");
    Ok(environment)
}

/// Turn a compartment name or OCID into an environment and an OCID.
async fn locate_compartment(
    client: &ObjectStorageClient,
    flag: Option<Environment>,
    compartment: &str,
) -> Result<(Environment, String)> {
    if is_compartment_ocid(compartment) {
        let environment = select_environment(client, flag)?;
        return Ok((environment, compartment.to_owned()));
    }
    let (environment, compartment_ocid) = client.resolve_compartment(compartment).await?;
    debug!(%environment, compartment_ocid, "resolved compartment name");
    Ok((environment, compartment_ocid))
}

async fn run(client: &ObjectStorageClient, cli: Cli) -> Result<()> {
    match cli.command {
        Command::Namespace => {
            let environment = select_environment(client, cli.env)?;
            let namespace = client.namespace(environment).await?;
            println!("{namespace}");
        }

        Command::ListBuckets { compartment } => {
            let (environment, compartment_ocid) = match compartment {
                Some(compartment) => locate_compartment(client, cli.env, &compartment).await?,
                None => (
                    select_environment(client, cli.env)?,
                    client.fallback_compartment().to_owned(),
                ),
            };
            let buckets = client.list_buckets(environment, &compartment_ocid).await?;
            if buckets.is_empty() {
                println!("No buckets in compartment {compartment_ocid}");
            } else {
                for bucket in buckets {
                    println!("{}", bucket.name);
                }
            }
        }

        Command::CreateBucket { name, compartment } => {
            let (environment, compartment_ocid) =
                locate_compartment(client, cli.env, &compartment).await?;
            client
                .create_bucket(environment, &name, &compartment_ocid)
                .await?;
            println!("Created bucket '{name}' in compartment {compartment_ocid}");
        }

        Command::Upload {
            bucket,
            file,
            object_name,
        } => {
            let environment = select_environment(client, cli.env)?;
            let object_name = match object_name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .context("file path has no file name; pass an object name")?,
            };
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let content_type = mime_guess::from_path(&object_name)
                .first_or_octet_stream()
                .essence_str()
                .to_owned();
            let size = content.len();
            client
                .put_object(environment, &bucket, &object_name, &content_type, content)
                .await?;
            println!("Uploaded '{object_name}' ({size} bytes) to bucket '{bucket}'");
        }

        Command::ListObjects { bucket } => {
            let environment = select_environment(client, cli.env)?;
            let objects = client.list_objects(environment, &bucket).await?;
            if objects.is_empty() {
                println!("No objects in bucket '{bucket}'");
            } else {
                for object in objects {
                    match object.size {
                        Some(size) => println!("{}\t{size}", object.name),
                        None => println!("{}", object.name),
                    }
                }
            }
        }

        Command::DeleteObject { bucket, object } => {
            let environment = select_environment(client, cli.env)?;
            client.delete_object(environment, &bucket, &object).await?;
            println!("Deleted object '{object}' from bucket '{bucket}'");
        }

        Command::DeleteBucket { bucket } => {
            let environment = select_environment(client, cli.env)?;
            client.delete_bucket(environment, &bucket).await?;
            println!("Deleted bucket '{bucket}'");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let registry = CredentialRegistry::from_env().context("loading signing credentials")?;
    let client = ObjectStorageClient::new(StorageConfig::from_env(), registry);

    run(&client, cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_create_bucket_command() {
        let cli = Cli::parse_from([
            "stowage",
            "create-bucket",
            "team-logs",
            "--compartment",
            "cp-dev-team",
        ]);
        match cli.command {
            Command::CreateBucket { name, compartment } => {
                assert_eq!(name, "team-logs");
                assert_eq!(compartment, "cp-dev-team");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_should_parse_global_env_flag() {
        let cli = Cli::parse_from(["stowage", "--env", "prd", "namespace"]);
        assert_eq!(cli.env, Some(Environment::Prd));

        let cli = Cli::parse_from(["stowage", "list-buckets", "--env", "dev"]);
        assert_eq!(cli.env, Some(Environment::Dev));
    }

    #[test]
    fn test_should_reject_unknown_env_value() {
        let result = Cli::try_parse_from(["stowage", "--env", "staging", "namespace"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_default_to_first_registered_environment() {
        use stowage_auth::{CredentialSet, KeySource};

        let set = |environment, user: &str| CredentialSet {
            environment,
            user_ocid: user.to_owned(),
            fingerprint: "12:34".to_owned(),
            key: KeySource::Path("/nonexistent.pem".into()),
        };
        // Prd registered first; the default is declaration order, not
        // insertion order.
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![
                set(Environment::Prd, "ocid1.user.oc1..prd"),
                set(Environment::Dev, "ocid1.user.oc1..dev"),
            ],
        );
        let client = ObjectStorageClient::new(StorageConfig::default(), registry);

        assert_eq!(select_environment(&client, None).unwrap(), Environment::Dev);
        assert_eq!(
            select_environment(&client, Some(Environment::Prd)).unwrap(),
            Environment::Prd
        );

        let empty = ObjectStorageClient::new(
            StorageConfig::default(),
            CredentialRegistry::new("ocid1.tenancy.oc1..tttt", Vec::new()),
        );
        assert!(select_environment(&empty, None).is_err());
    }

    #[test]
    fn test_should_parse_upload_with_optional_object_name() {
        let cli = Cli::parse_from(["stowage", "upload", "team-logs", "./report.csv"]);
        match cli.command {
            Command::Upload {
                bucket,
                file,
                object_name,
            } => {
                assert_eq!(bucket, "team-logs");
                assert_eq!(file, PathBuf::from("./report.csv"));
                assert!(object_name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_should_parse_delete_object_command() {
        let cli = Cli::parse_from(["stowage", "delete-object", "team-logs", "2024/07/app.log"]);
        match cli.command {
            Command::DeleteObject { bucket, object } => {
                assert_eq!(bucket, "team-logs");
                assert_eq!(object, "2024/07/app.log");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
