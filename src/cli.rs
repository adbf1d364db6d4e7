use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cms::{
    self, CmsApi, CmsClient, Compensation, EditOptions, FindAndReplace, ImageTransfer,
    SessionToken, TokenCache,
};
use crate::config::Config;
use crate::load_config::load_config;
use crate::secrets::{get_op_secret, OpCli, SecretReader};
use crate::{date, logs};

/// CLI for mc-utils: Modern Campus CMS chores and small helpers.
#[derive(Parser)]
#[clap(
    name = "mc-utils",
    version,
    about = "Modern Campus CMS helpers: page find-and-replace, calendars, gallery transfers"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = "mc-utils.yaml")]
    pub config: PathBuf,

    /// Debug logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find and replace text in a page's source, then save and check it in
    Replace(ReplaceArgs),
    /// Print every calendar event of a site
    Calendar {
        #[clap(long)]
        account: String,
        #[clap(long)]
        site: String,
        /// Repeat to filter by several categories
        #[clap(long = "category")]
        categories: Vec<String>,
    },
    /// Recreate a gallery asset on another account
    TransferAsset {
        #[clap(long)]
        from_account: String,
        #[clap(long)]
        to_account: String,
        #[clap(long)]
        site: String,
        #[clap(long)]
        asset: i64,
        /// Tag added to the copy
        #[clap(long)]
        default_tag: String,
        /// Also copy the gallery's images into the new asset
        #[clap(long)]
        with_images: bool,
    },
    /// Copy the images of one gallery asset into another
    TransferImages {
        #[clap(long)]
        from_account: String,
        #[clap(long)]
        from_site: String,
        #[clap(long)]
        from_asset: i64,
        #[clap(long)]
        to_account: String,
        #[clap(long)]
        to_site: String,
        #[clap(long)]
        to_asset: i64,
    },
    /// Read a secret from 1Password (op://vault/item/field)
    Secret { reference: String },
    /// Show every terminal colour and style
    Colors,
    /// Print the current time as a file-system-safe string
    Stamp,
}

#[derive(Args)]
pub struct ReplaceArgs {
    #[clap(long)]
    pub account: String,
    #[clap(long)]
    pub site: String,
    #[clap(long)]
    pub path: String,
    /// Text to find; pairs up with --replace in order
    #[clap(long = "find", required = true)]
    pub finds: Vec<String>,
    #[clap(long = "replace", required = true)]
    pub replaces: Vec<String>,
    /// Treat --find values as regular expressions; --replace may use $1 or
    /// ${1} (braces are needed before letters, digits or _, as in ${1}x)
    #[clap(long)]
    pub regex: bool,
    /// Skip directives that match nothing instead of failing
    #[clap(long)]
    pub lenient: bool,
    /// On failure, leave the page checked out instead of checking it back in
    #[clap(long)]
    pub leave_checked_out: bool,
}

impl ReplaceArgs {
    pub fn directives(&self) -> Result<Vec<FindAndReplace>> {
        if self.finds.len() != self.replaces.len() {
            anyhow::bail!(
                "--find given {} times but --replace {} times",
                self.finds.len(),
                self.replaces.len()
            );
        }
        self.finds
            .iter()
            .zip(&self.replaces)
            .map(|(find, replace)| {
                if self.regex {
                    FindAndReplace::regex(find, replace.clone())
                        .with_context(|| format!("invalid regex {find:?}"))
                } else {
                    Ok(FindAndReplace::literal(find.clone(), replace.clone()))
                }
            })
            .collect()
    }

    pub fn options(&self) -> EditOptions {
        EditOptions {
            error_out: !self.lenient,
            compensation: if self.leave_checked_out {
                Compensation::LeaveCheckedOut
            } else {
                Compensation::ReleaseLock
            },
        }
    }
}

/// Everything a CMS command needs: config, client, tokens, secret source.
pub struct Session {
    config: Config,
    client: CmsClient,
    tokens: TokenCache,
    secrets: Box<dyn SecretReader>,
}

impl Session {
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = load_config(config_path)?;
        let client = CmsClient::new(&config.cms).context("Failed to construct CMS client")?;
        Ok(Self {
            config,
            client,
            tokens: TokenCache::new(),
            secrets: Box::new(OpCli::new()),
        })
    }

    pub async fn token(&self, account: &str) -> Result<SessionToken> {
        if let Some(token) = self.tokens.get(account) {
            return Ok(token);
        }
        let account_config = self
            .config
            .account(account)
            .with_context(|| format!("account {account:?} is not in the config"))?;
        let creds = account_config
            .credentials(self.secrets.as_ref())
            .with_context(|| format!("Failed to resolve password for {account:?}"))?;
        let token = self
            .tokens
            .get_login_token(&self.client, &creds.account, &creds.username, &creds.password)
            .await
            .with_context(|| format!("Login failed for {account:?}"))?;
        Ok(token)
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Colors => {
            logs::log_all_colors()?;
            Ok(())
        }
        Commands::Stamp => {
            println!("{}", date::file_system_safe_now());
            Ok(())
        }
        Commands::Secret { reference } => {
            let secret = get_op_secret(&reference)?;
            println!("{secret}");
            Ok(())
        }
        command => {
            let session = Session::open(&cli.config)?;
            let result = run_cms(&session, command).await;
            if let Err(e) = &result {
                error!(error = ?e, "[CLI][ERROR] Command failed");
            }
            result
        }
    }
}

/// A `transfer-asset` run. The copy lives on the same site as the original.
#[derive(Debug, Clone, Copy)]
pub struct AssetCopy<'a> {
    pub source_token: &'a SessionToken,
    pub destination_token: &'a SessionToken,
    pub site: &'a str,
    pub asset: i64,
    pub default_tag: &'a str,
    pub with_images: bool,
}

/// Creates the copy and, when asked, fills it with the original's images.
/// Returns the new asset id and the uploaded image names.
pub async fn copy_gallery_asset<A>(api: &A, copy: AssetCopy<'_>) -> Result<(i64, Vec<String>)>
where
    A: CmsApi + ?Sized,
{
    let new_asset = cms::transfer_gallery_asset(
        api,
        copy.asset,
        copy.destination_token,
        copy.source_token,
        copy.site,
        copy.default_tag,
    )
    .await?;
    logs::log(
        format!("Created asset {new_asset} from {}", copy.asset),
        &logs::LogOptions::new().cc(logs::CC::Green),
    )?;
    if !copy.with_images {
        return Ok((new_asset, Vec::new()));
    }

    let names = cms::transfer_images_for_gallery_asset(
        api,
        ImageTransfer {
            source_token: copy.source_token,
            source_site: copy.site,
            source_asset: copy.asset,
            destination_token: copy.destination_token,
            destination_site: copy.site,
            destination_asset: new_asset,
        },
        Compensation::ReleaseLock,
    )
    .await?;
    logs::log(
        format!("Copied {} images", names.len()),
        &logs::LogOptions::new().cc(logs::CC::Green),
    )?;
    Ok((new_asset, names))
}

async fn run_cms(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Replace(args) => {
            let directives = args.directives()?;
            let token = session.token(&args.account).await?;
            let saved = cms::find_and_replace_all_in_page(
                &session.client,
                &token,
                &args.site,
                &args.path,
                &directives,
                args.options(),
            )
            .await?;
            logs::log(
                format!("Saved {}{}", args.site, args.path),
                &logs::LogOptions::new().cc(logs::CC::Green),
            )?;
            info!(response = %saved, "[CLI] Save response");
            Ok(())
        }
        Commands::Calendar {
            account,
            site,
            categories,
        } => {
            let token = session.token(&account).await?;
            let events =
                cms::get_all_calendar_entries(&session.client, &token, &site, &categories).await?;
            println!("{events}");
            Ok(())
        }
        Commands::TransferAsset {
            from_account,
            to_account,
            site,
            asset,
            default_tag,
            with_images,
        } => {
            let source_token = session.token(&from_account).await?;
            let destination_token = session.token(&to_account).await?;
            let copy = AssetCopy {
                source_token: &source_token,
                destination_token: &destination_token,
                site: &site,
                asset,
                default_tag: &default_tag,
                with_images,
            };
            let (new_asset, _) = copy_gallery_asset(&session.client, copy).await?;
            println!("{new_asset}");
            Ok(())
        }
        Commands::TransferImages {
            from_account,
            from_site,
            from_asset,
            to_account,
            to_site,
            to_asset,
        } => {
            let source_token = session.token(&from_account).await?;
            let destination_token = session.token(&to_account).await?;
            let names = cms::transfer_images_for_gallery_asset(
                &session.client,
                ImageTransfer {
                    source_token: &source_token,
                    source_site: &from_site,
                    source_asset: from_asset,
                    destination_token: &destination_token,
                    destination_site: &to_site,
                    destination_asset: to_asset,
                },
                Compensation::ReleaseLock,
            )
            .await?;
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Colors | Commands::Stamp | Commands::Secret { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace_args(finds: &[&str], replaces: &[&str], regex: bool) -> ReplaceArgs {
        ReplaceArgs {
            account: "a".into(),
            site: "s".into(),
            path: "/index.pcf".into(),
            finds: finds.iter().map(|s| s.to_string()).collect(),
            replaces: replaces.iter().map(|s| s.to_string()).collect(),
            regex,
            lenient: false,
            leave_checked_out: false,
        }
    }

    #[test]
    fn find_and_replace_must_pair_up() {
        assert!(replace_args(&["a", "b"], &["c"], false).directives().is_err());
        assert_eq!(
            replace_args(&["a", "b"], &["c", "d"], false)
                .directives()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn bad_regex_is_reported() {
        let err = replace_args(&["("], &["x"], true).directives().unwrap_err();
        assert!(err.to_string().contains("invalid regex"));
    }

    #[test]
    fn flags_map_to_edit_options() {
        let mut args = replace_args(&["a"], &["b"], false);
        assert!(args.options().error_out);
        assert_eq!(args.options().compensation, Compensation::ReleaseLock);
        args.lenient = true;
        args.leave_checked_out = true;
        assert!(!args.options().error_out);
        assert_eq!(args.options().compensation, Compensation::LeaveCheckedOut);
    }

    #[test]
    fn cli_parses_repeated_categories() {
        let cli = Cli::parse_from([
            "mc-utils", "calendar", "--account", "main", "--site", "www", "--category", "A",
            "--category", "B",
        ]);
        match cli.command {
            Commands::Calendar { categories, .. } => assert_eq!(categories, vec!["A", "B"]),
            _ => panic!("expected calendar"),
        }
    }

    #[test]
    fn transfer_asset_has_no_separate_destination_site() {
        let parsed = Cli::try_parse_from([
            "mc-utils", "transfer-asset", "--from-account", "old", "--to-account", "new",
            "--site", "a", "--asset", "42", "--default-tag", "t", "--with-images", "--to-site",
            "b",
        ]);
        assert!(parsed.is_err());
    }

    fn asset_body() -> String {
        serde_json::json!({
            "name": "Quad", "type": 1, "tags": [],
            "gallery": {"childNodes": [
                {"tagName": "thumbnailWidth", "childNodes": [150]},
                {"tagName": "thumbnailHeight", "childNodes": [100]},
                {"tagName": "forceCrop", "childNodes": [false]},
                {"tagName": "images", "childNodes": [
                    {"tagName": "image", "staging_url": "https://staging.example.edu/q.jpg",
                     "childNodes": [{"tagName": "friendlyName", "childNodes": ["q.jpg"]}]}
                ]}
            ]}
        })
        .to_string()
    }

    #[tokio::test]
    async fn images_go_to_the_new_asset_on_the_same_site() {
        use crate::cms::MockCmsApi;

        let mut api = MockCmsApi::new();
        api.expect_view_asset()
            .withf(|_, site, asset| site == "www" && *asset == 42)
            .times(2)
            .returning(|_, _, _| Ok(asset_body()));
        api.expect_new_asset()
            .withf(|token, site, _| token.as_str() == "new" && site == "www")
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!({"asset": 77})));
        api.expect_check_asset()
            .withf(|token, site, asset, _| {
                token.as_str() == "new" && site == "www" && *asset == 77
            })
            .times(2)
            .returning(|_, _, _, _| Ok(String::new()));
        api.expect_download().returning(|_| Ok(vec![1, 2, 3]));
        api.expect_add_image()
            .withf(|token, site, asset, _| {
                token.as_str() == "new" && site == "www" && *asset == 77
            })
            .times(1)
            .returning(|_, _, _, _| Ok(serde_json::json!({"image": "q_1.jpg"})));
        api.expect_save_asset_images()
            .withf(|_, site, asset, _| site == "www" && *asset == 77)
            .times(1)
            .returning(|_, _, _, _| Ok("saved".to_string()));

        let source_token = SessionToken::new("old");
        let destination_token = SessionToken::new("new");
        let copy = AssetCopy {
            source_token: &source_token,
            destination_token: &destination_token,
            site: "www",
            asset: 42,
            default_tag: "migrated",
            with_images: true,
        };
        let (new_asset, names) = copy_gallery_asset(&api, copy).await.unwrap();
        assert_eq!(new_asset, 77);
        assert_eq!(names, vec!["q_1.jpg"]);
    }

    #[tokio::test]
    async fn without_images_only_the_asset_is_created() {
        use crate::cms::MockCmsApi;

        let mut api = MockCmsApi::new();
        api.expect_view_asset()
            .times(1)
            .returning(|_, _, _| Ok(asset_body()));
        api.expect_new_asset()
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!({"asset": "78"})));
        api.expect_check_asset().never();
        api.expect_add_image().never();

        let token = SessionToken::new("t");
        let copy = AssetCopy {
            source_token: &token,
            destination_token: &token,
            site: "www",
            asset: 42,
            default_tag: "migrated",
            with_images: false,
        };
        let (new_asset, names) = copy_gallery_asset(&api, copy).await.unwrap();
        assert_eq!(new_asset, 78);
        assert!(names.is_empty());
    }
}
