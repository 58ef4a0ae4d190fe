//! 실행 핸들과 결과 보고
//!
//! [`RunHandle`]은 백그라운드에서 진행 중인 실행 하나를 가리킵니다.
//! HTTP 수신 경로는 핸들을 `detach()`하고, 테스트는 `join()`으로 결과를 기다립니다.

use testgate_core::event::NotificationKind;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PublishError, RunError};

/// 실행 종료 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTermination {
    /// 헬스 게이트 실패 (evaluation-done 발행)
    HealthCheckFailed,
    /// 빈 테스트 전략: 헬스 게이트 통과 후 종료
    NoTest,
    /// 인식하지 못한 테스트 전략: 헬스 게이트 통과 후 종료
    UnknownStrategy(String),
    /// 전략 테스트 판정 (통과 시 tests-finished, 실패 시 evaluation-done 발행)
    Verdict {
        /// 통과 여부
        passed: bool,
    },
    /// 판정 없이 중단 (알림 없음)
    Aborted(RunError),
}

impl RunTermination {
    /// 메트릭 레이블용 고정 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::HealthCheckFailed => "health_check_failed",
            Self::NoTest => "no_test",
            Self::UnknownStrategy(_) => "unknown_strategy",
            Self::Verdict { passed: true } => "passed",
            Self::Verdict { passed: false } => "failed",
            Self::Aborted(RunError::Cancelled) => "cancelled",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// 종료된 실행의 보고서
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// 실행 ID
    pub run_id: String,
    /// 상관관계 ID
    pub correlation_id: String,
    /// 종료 상태
    pub termination: RunTermination,
    /// 발행을 시도한 알림 (없으면 None)
    pub notification: Option<NotificationKind>,
    /// 알림 전달 실패 사유
    pub publish_error: Option<PublishError>,
}

impl RunReport {
    /// 알림이 실제로 전달되었는지 여부
    pub fn delivered(&self) -> bool {
        self.notification.is_some() && self.publish_error.is_none()
    }
}

/// 백그라운드 실행 핸들
///
/// 핸들을 drop해도 실행은 계속됩니다. 취소하려면 [`RunHandle::cancel`]을 호출합니다.
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    correlation_id: String,
    cancel: CancellationToken,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        correlation_id: String,
        cancel: CancellationToken,
        task: JoinHandle<RunReport>,
    ) -> Self {
        Self {
            run_id,
            correlation_id,
            cancel,
            task,
        }
    }

    /// 실행 ID
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// 상관관계 ID
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// 실행 취소를 요청합니다. 진행 중인 외부 프로세스는 종료됩니다.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 실행이 끝났는지 여부
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 실행이 끝날 때까지 기다리고 보고서를 반환합니다.
    pub async fn join(self) -> RunReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => RunReport {
                run_id: self.run_id,
                correlation_id: self.correlation_id,
                termination: RunTermination::Aborted(RunError::TaskFailed(e.to_string())),
                notification: None,
                publish_error: None,
            },
        }
    }

    /// 핸들을 놓고 실행을 백그라운드에 맡깁니다.
    pub fn detach(self) {
        drop(self.task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(termination: RunTermination) -> RunReport {
        RunReport {
            run_id: "r".to_owned(),
            correlation_id: "c".to_owned(),
            termination,
            notification: None,
            publish_error: None,
        }
    }

    #[test]
    fn termination_labels() {
        assert_eq!(RunTermination::Verdict { passed: true }.label(), "passed");
        assert_eq!(RunTermination::Verdict { passed: false }.label(), "failed");
        assert_eq!(RunTermination::Aborted(RunError::Cancelled).label(), "cancelled");
        assert_eq!(
            RunTermination::Aborted(RunError::Execution("x".to_owned())).label(),
            "aborted"
        );
    }

    #[test]
    fn delivered_requires_notification_without_error() {
        assert!(!report(RunTermination::NoTest).delivered());

        let mut r = report(RunTermination::HealthCheckFailed);
        r.notification = Some(NotificationKind::EvaluationDone);
        assert!(r.delivered());

        r.publish_error = Some(PublishError {
            kind: NotificationKind::EvaluationDone,
            reason: "503".to_owned(),
        });
        assert!(!r.delivered());
    }

    #[tokio::test]
    async fn join_returns_task_report() {
        let task = tokio::spawn(async { report(RunTermination::NoTest) });
        let handle = RunHandle::new("r".to_owned(), "c".to_owned(), CancellationToken::new(), task);
        assert_eq!(handle.run_id(), "r");
        let joined = handle.join().await;
        assert_eq!(joined.termination, RunTermination::NoTest);
    }

    #[tokio::test]
    async fn join_reports_aborted_task_as_failed() {
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
            report(RunTermination::NoTest)
        });
        task.abort();
        let handle = RunHandle::new("r".to_owned(), "c".to_owned(), CancellationToken::new(), task);
        let joined = handle.join().await;
        assert!(matches!(
            joined.termination,
            RunTermination::Aborted(RunError::TaskFailed(_))
        ));
    }

    #[tokio::test]
    async fn cancel_trips_token() {
        let token = CancellationToken::new();
        let watched = token.clone();
        let task = tokio::spawn(async move {
            watched.cancelled().await;
            report(RunTermination::Aborted(RunError::Cancelled))
        });
        let handle = RunHandle::new("r".to_owned(), "c".to_owned(), token, task);
        handle.cancel();
        let joined = handle.join().await;
        assert_eq!(joined.termination.label(), "cancelled");
    }
}
