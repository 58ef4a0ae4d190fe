//! 실행 컨텍스트
//!
//! 수락된 알림 하나당 [`TestRunContext`] 하나가 만들어지며 이후 변경되지 않습니다.

use std::path::{Path, PathBuf};

use testgate_core::event::DeploymentNotification;
use testgate_integrations::run_dir;
use tracing::{Span, info_span};

/// 실행 하나의 불변 컨텍스트
#[derive(Debug, Clone)]
pub struct TestRunContext {
    /// 실행마다 새로 발급되는 ID (UUID v4)
    pub run_id: String,
    /// 수신 알림의 상관관계 ID (없으면 빈 문자열)
    pub correlation_id: String,
    /// 수신 알림
    pub notification: DeploymentNotification,
    /// 이 실행의 아티팩트 디렉토리 (`<work_dir>/<run_id>`)
    pub run_dir: PathBuf,
    /// `run_id`, `keptn_context`가 바인딩된 span
    pub span: Span,
}

impl TestRunContext {
    /// 검증된 알림으로 컨텍스트를 만듭니다.
    pub fn new(notification: DeploymentNotification, work_dir: &Path) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let correlation_id = notification.correlation_id.clone();
        let data = &notification.data;
        let span = info_span!(
            "test_run",
            run_id = run_id.as_str(),
            keptn_context = correlation_id.as_str(),
            project = data.project.as_str(),
            stage = data.stage.as_str(),
            service = data.service.as_str(),
        );

        Self {
            run_dir: run_dir(work_dir, &run_id),
            run_id,
            correlation_id,
            notification,
            span,
        }
    }

    /// 서비스명
    pub fn service(&self) -> &str {
        &self.notification.data.service
    }

    /// 배포 네임스페이스 (`<project>-<stage>`)
    pub fn namespace(&self) -> String {
        self.notification.data.namespace()
    }
}
