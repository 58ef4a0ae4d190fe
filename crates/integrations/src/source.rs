//! 테스트 계획 저장소 체크아웃

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use testgate_core::config::SourceConfig;
use tokio::process::Command;
use tracing::info;

use crate::error::IntegrationError;
use crate::process::{last_diagnostic_line, run_with_timeout, validate_name};

const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// 서비스의 테스트 계획 소스를 가져오는 trait
pub trait SourceFetcher: Send + Sync + 'static {
    /// `<org>/<service>` 저장소를 `dest_root/<service>`로 가져오고 그 경로를 반환합니다.
    fn fetch(
        &self,
        org: &str,
        service: &str,
        dest_root: &Path,
    ) -> impl Future<Output = Result<PathBuf, IntegrationError>> + Send;
}

/// `git clone --depth 1` 기반 체크아웃
pub struct GitSourceFetcher {
    git: String,
    base_url: String,
    revision: String,
}

impl GitSourceFetcher {
    /// 새 fetcher를 생성합니다.
    pub fn new(
        git: impl Into<String>,
        base_url: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            git: git.into(),
            base_url: base_url.into(),
            revision: revision.into(),
        }
    }

    /// 소스 설정에서 fetcher를 생성합니다.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            config.git.clone(),
            config.base_url.clone(),
            config.revision.clone(),
        )
    }

    /// 저장소 URL (`<base_url>/<org>/<service>.git`)
    pub fn repository_url(&self, org: &str, service: &str) -> String {
        format!(
            "{}/{org}/{service}.git",
            self.base_url.trim_end_matches('/')
        )
    }

    fn command(&self, url: &str, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.args(["clone", "--quiet", "--depth", "1", "--branch"])
            .arg(&self.revision)
            .arg(url)
            .arg(dest);
        cmd
    }
}

impl SourceFetcher for GitSourceFetcher {
    async fn fetch(
        &self,
        org: &str,
        service: &str,
        dest_root: &Path,
    ) -> Result<PathBuf, IntegrationError> {
        validate_name("githuborg", org)?;
        validate_name("service", service)?;

        let url = self.repository_url(org, service);
        let dest = dest_root.join(service);
        let failed = |reason: String| IntegrationError::SourceFetch {
            url: url.clone(),
            reason,
        };

        tokio::fs::create_dir_all(dest_root)
            .await
            .map_err(|e| failed(format!("create {}: {e}", dest_root.display())))?;
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&dest)
                .await
                .map_err(|e| failed(format!("remove stale {}: {e}", dest.display())))?;
        }

        let output = run_with_timeout(self.command(&url, &dest), CLONE_TIMEOUT)
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(last_diagnostic_line(&output)));
        }

        info!(
            url = url.as_str(),
            revision = self.revision.as_str(),
            dest = %dest.display(),
            "test plan source checked out"
        );
        Ok(dest)
    }
}
