// System
use std::path::PathBuf;

// Third Party
use anyhow::Context;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};

/// Gives every new namespace a default NetworkPolicy that only admits traffic from inside it.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "namespace-isolator", version)]
pub struct Args {
    /// Kubernetes API server URL. Overrides the server from the kubeconfig.
    #[arg(long, default_value = "")]
    pub master: String,

    /// Path to a kubeconfig file. In-cluster configuration is used when neither flag is set.
    #[arg(long, default_value = "")]
    pub kubeconfig: String,
}

impl Args {
    fn master(&self) -> Option<&str> {
        Some(self.master.trim()).filter(|s| !s.is_empty())
    }

    fn kubeconfig(&self) -> Option<PathBuf> {
        Some(self.kubeconfig.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Build the client configuration the flags describe.
    pub async fn client_config(&self) -> anyhow::Result<kube::Config> {
        let mut config = match self.kubeconfig() {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(&path)
                    .with_context(|| format!("reading kubeconfig {}", path.display()))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("loading kubeconfig")?
            }
            None => kube::Config::infer()
                .await
                .context("inferring cluster configuration")?,
        };
        if let Some(master) = self.master() {
            config.cluster_url = master
                .parse()
                .with_context(|| format!("invalid master url {}", master))?;
        }
        Ok(config)
    }
}
