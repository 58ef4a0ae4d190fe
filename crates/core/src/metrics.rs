//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `testgate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use testgate_core::metrics as m;
//!
//! metrics::counter!(m::EVENTS_ACCEPTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 거부 사유 레이블 키 (unexpected_type, payload_decode, malformed)
pub const LABEL_REASON: &str = "reason";

/// 테스트 전략 레이블 키 (functional, performance)
pub const LABEL_STRATEGY: &str = "strategy";

/// 결과 레이블 키 (passed, failed, error)
pub const LABEL_RESULT: &str = "result";

/// 발신 알림 종류 레이블 키 (tests_finished, evaluation_done)
pub const LABEL_NOTIFICATION: &str = "notification";

/// 실행 종료 상태 레이블 키
pub const LABEL_TERMINATION: &str = "termination";

// ─── 수신 메트릭 ────────────────────────────────────────────────────

/// 수락된 deployment-finished 이벤트 수 (counter)
pub const EVENTS_ACCEPTED_TOTAL: &str = "testgate_events_accepted_total";

/// 거부된 이벤트 수 (counter, label: reason)
pub const EVENTS_REJECTED_TOTAL: &str = "testgate_events_rejected_total";

// ─── 실행 메트릭 ────────────────────────────────────────────────────

/// 진행 중인 실행 수 (gauge)
pub const RUNS_IN_FLIGHT: &str = "testgate_runs_in_flight";

/// 종료된 실행 수 (counter, label: termination)
pub const RUNS_COMPLETED_TOTAL: &str = "testgate_runs_completed_total";

/// 헬스 체크 결과 수 (counter, label: result)
pub const HEALTH_CHECKS_TOTAL: &str = "testgate_health_checks_total";

/// 실행된 테스트 단계 수 (counter, labels: strategy, result)
pub const TESTS_EXECUTED_TOTAL: &str = "testgate_tests_executed_total";

/// 테스트 단계 소요 시간 (histogram, 초)
pub const TEST_DURATION_SECONDS: &str = "testgate_test_duration_seconds";

// ─── 발신 메트릭 ────────────────────────────────────────────────────

/// 발행 시도한 알림 수 (counter, labels: notification, result)
pub const NOTIFICATIONS_PUBLISHED_TOTAL: &str = "testgate_notifications_published_total";

// ─── 서비스 메트릭 ──────────────────────────────────────────────────

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const SERVICE_BUILD_INFO: &str = "testgate_service_build_info";

/// 가동 시간 (gauge, 초)
pub const SERVICE_UPTIME_SECONDS: &str = "testgate_service_uptime_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        EVENTS_ACCEPTED_TOTAL,
        "deployment-finished events accepted and handed to a run"
    );
    describe_counter!(
        EVENTS_REJECTED_TOTAL,
        "Inbound events rejected at ingress, by reason"
    );

    describe_gauge!(RUNS_IN_FLIGHT, "Test runs currently executing");
    describe_counter!(
        RUNS_COMPLETED_TOTAL,
        "Test runs that reached a terminal state, by termination"
    );
    describe_counter!(HEALTH_CHECKS_TOTAL, "Health gate results");
    describe_counter!(
        TESTS_EXECUTED_TOTAL,
        "Strategy test stages executed, by strategy and result"
    );
    describe_histogram!(
        TEST_DURATION_SECONDS,
        "Strategy test stage duration in seconds"
    );

    describe_counter!(
        NOTIFICATIONS_PUBLISHED_TOTAL,
        "Outgoing notifications, by type and delivery result"
    );

    describe_gauge!(SERVICE_BUILD_INFO, "Build information (always 1)");
    describe_gauge!(SERVICE_UPTIME_SECONDS, "Service uptime in seconds");
}
