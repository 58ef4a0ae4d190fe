//! 실행별 아티팩트 경로와 정리
//!
//! 모든 아티팩트는 `<work_dir>/<run_id>/` 아래에 놓입니다.
//!
//! ```text
//! <work_dir>/<run_id>/
//! ├── <service>/                  체크아웃된 테스트 계획
//! ├── HealthCheck_<service>/      HTML 리포트 (스모크가 아닌 실행만)
//! ├── HealthCheck_<service>_result.tlf
//! ├── HealthCheck_<service>.log   실행기 로그
//! └── output.txt                  마지막 실행의 표준 출력
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::IntegrationError;

/// 실행기 표준 출력 파일 이름
pub const OUTPUT_FILE: &str = "output.txt";

/// 한 테스트 단계의 아티팩트 경로 모음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// HTML 리포트 디렉토리
    pub report_dir: PathBuf,
    /// 샘플 결과 파일
    pub result_file: PathBuf,
    /// 실행기 로그 파일
    pub log_file: PathBuf,
    /// 표준 출력 파일
    pub output_file: PathBuf,
}

impl ArtifactPaths {
    /// `artifact_dir` 아래의 `prefix` 아티팩트 경로를 계산합니다.
    pub fn new(artifact_dir: &Path, prefix: &str) -> Self {
        Self {
            report_dir: artifact_dir.join(prefix),
            result_file: artifact_dir.join(format!("{prefix}_result.tlf")),
            log_file: artifact_dir.join(format!("{prefix}.log")),
            output_file: artifact_dir.join(OUTPUT_FILE),
        }
    }

    /// 이전 실행이 남긴 아티팩트를 제거합니다. 없는 경로는 무시합니다.
    pub async fn clear(&self) -> Result<(), IntegrationError> {
        remove_dir_if_exists(&self.report_dir).await?;
        for file in [&self.result_file, &self.log_file, &self.output_file] {
            remove_file_if_exists(file).await?;
        }
        debug!(report_dir = %self.report_dir.display(), "stage artifacts cleared");
        Ok(())
    }
}

/// 실행 전용 디렉토리 경로 (`<work_dir>/<run_id>`)
pub fn run_dir(work_dir: &Path, run_id: &str) -> PathBuf {
    work_dir.join(run_id)
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), IntegrationError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(artifact_error(path, e)),
    }
}

async fn remove_file_if_exists(path: &Path) -> Result<(), IntegrationError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(artifact_error(path, e)),
    }
}

fn artifact_error(path: &Path, e: std::io::Error) -> IntegrationError {
    IntegrationError::Artifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
