//! 외부 프로세스 실행 헬퍼
//!
//! 모든 협력자 구현이 공유하는 실행 경로입니다.
//! 프로세스는 셸 없이 실행되며, 제한 시간이 지나면 future가 drop되면서
//! `kill_on_drop`에 의해 종료됩니다.

use std::process::{Output, Stdio};
use std::time::Duration;

use testgate_core::types::check_resource_name;
use tokio::process::Command;
use tracing::debug;

use crate::error::IntegrationError;

/// 외부 프로세스 실행 실패
#[derive(Debug)]
pub(crate) enum CommandFailure {
    /// 프로세스를 시작할 수 없음
    Spawn(std::io::Error),
    /// 제한 시간 초과
    TimedOut(Duration),
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn: {e}"),
            Self::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// 명령을 실행하고 출력을 수집합니다.
///
/// 종료 코드는 해석하지 않습니다. 호출자가 `Output::status`를 확인해야 합니다.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    limit: Duration,
) -> Result<Output, CommandFailure> {
    cmd.kill_on_drop(true).stdin(Stdio::null());
    debug!(command = %describe(&cmd), timeout_secs = limit.as_secs(), "running external command");

    match tokio::time::timeout(limit, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(CommandFailure::Spawn(e)),
        Err(_) => Err(CommandFailure::TimedOut(limit)),
    }
}

/// 로그용 명령 문자열
pub(crate) fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let mut parts = vec![std_cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// 표준 에러의 마지막 비어있지 않은 줄 (없으면 표준 출력)
pub(crate) fn last_diagnostic_line(output: &Output) -> String {
    let pick = |bytes: &[u8]| {
        String::from_utf8_lossy(bytes)
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_owned)
    };
    pick(&output.stderr)
        .or_else(|| pick(&output.stdout))
        .unwrap_or_else(|| format!("exit status {}", output.status))
}

/// 외부 도구에 전달할 이름 인자를 검증합니다.
///
/// 규칙은 [`check_resource_name`]과 같습니다. `.`/`..`, `-`로 시작하는 값,
/// 경로 구분자나 공백을 포함한 값은 거부됩니다.
pub(crate) fn validate_name(field: &str, value: &str) -> Result<(), IntegrationError> {
    check_resource_name(field, value).map_err(|e| IntegrationError::InvalidArgument {
        field: e.field,
        reason: e.reason.to_owned(),
    })
}
