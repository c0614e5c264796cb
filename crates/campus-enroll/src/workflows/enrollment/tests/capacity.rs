use std::thread;

use super::common::*;
use crate::workflows::enrollment::domain::{EnrollmentOutcome, EnrollmentStatus, StudentId};
use crate::workflows::enrollment::repository::EnrollmentStore;
use crate::workflows::enrollment::service::EnrollmentError;

#[test]
fn admits_as_pending_until_capacity_then_waitlists() {
    let (service, _, _, _, course_id) = service_with_course("CS-101", 2);

    let first = service
        .enroll(StudentId("s1".to_string()), course_id.clone())
        .expect("first enroll");
    let second = service
        .enroll(StudentId("s2".to_string()), course_id.clone())
        .expect("second enroll");
    let third = service
        .enroll(StudentId("s3".to_string()), course_id.clone())
        .expect("third enroll");

    match first {
        EnrollmentOutcome::Admitted(record) => {
            assert_eq!(record.status, EnrollmentStatus::Pending)
        }
        other => panic!("expected admission, got {other:?}"),
    }
    assert!(matches!(second, EnrollmentOutcome::Admitted(_)));
    match third {
        EnrollmentOutcome::Waitlisted(record) => {
            assert_eq!(record.status, EnrollmentStatus::Waitlisted)
        }
        other => panic!("expected waitlisting, got {other:?}"),
    }
}

#[test]
fn duplicate_request_returns_existing_record_without_mutation() {
    let (service, store, _, _, course_id) = service_with_course("CS-101", 2);

    let first = service
        .enroll(StudentId("s1".to_string()), course_id.clone())
        .expect("first enroll");
    let second = service
        .enroll(StudentId("s1".to_string()), course_id.clone())
        .expect("second enroll");

    match second {
        EnrollmentOutcome::AlreadyEnrolled(record) => {
            assert_eq!(record.id, first.record().id);
        }
        other => panic!("expected already-enrolled, got {other:?}"),
    }
    assert_eq!(store.course_enrollments(&course_id).unwrap().len(), 1);
}

#[test]
fn concurrent_enrollments_never_over_admit() {
    let (service, store, _, _, course_id) = service_with_course("CS-101", 2);

    let outcomes: Vec<EnrollmentOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=3)
            .map(|n| {
                let service = service.clone();
                let course_id = course_id.clone();
                scope.spawn(move || {
                    service
                        .enroll(StudentId(format!("s{n}")), course_id)
                        .expect("enroll succeeds")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    let admitted = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, EnrollmentOutcome::Admitted(_)))
        .count();
    let waitlisted = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, EnrollmentOutcome::Waitlisted(_)))
        .count();

    assert_eq!(admitted, 2);
    assert_eq!(waitlisted, 1);
    assert_eq!(
        store
            .status_count(&course_id, EnrollmentStatus::Pending)
            .unwrap(),
        2
    );
    assert_eq!(
        store
            .status_count(&course_id, EnrollmentStatus::Waitlisted)
            .unwrap(),
        1
    );
}

#[test]
fn concurrent_storm_respects_capacity_for_larger_cohorts() {
    let (service, store, _, _, course_id) = service_with_course("CS-201", 5);

    thread::scope(|scope| {
        for n in 0..16 {
            let service = service.clone();
            let course_id = course_id.clone();
            scope.spawn(move || {
                service
                    .enroll(StudentId(format!("s{n:02}")), course_id)
                    .expect("enroll succeeds")
            });
        }
    });

    let pending = store
        .status_count(&course_id, EnrollmentStatus::Pending)
        .unwrap();
    let waitlisted = store
        .status_count(&course_id, EnrollmentStatus::Waitlisted)
        .unwrap();
    assert_eq!(pending, 5);
    assert_eq!(waitlisted, 11);
}

#[test]
fn direct_join_inserts_approved_and_refuses_when_full() {
    let (service, store, _, _, course_id) = service_with_course("CS-101", 1);

    let joined = service
        .join_with_access_code(StudentId("s1".to_string()), "CODE-CS-101")
        .expect("join succeeds");
    match joined {
        EnrollmentOutcome::Admitted(record) => {
            assert_eq!(record.status, EnrollmentStatus::Approved)
        }
        other => panic!("expected direct admission, got {other:?}"),
    }

    match service.join_with_access_code(StudentId("s2".to_string()), "CODE-CS-101") {
        Err(EnrollmentError::CapacityExhausted) => {}
        other => panic!("expected capacity refusal, got {other:?}"),
    }
    assert_eq!(store.course_enrollments(&course_id).unwrap().len(), 1);
}

#[test]
fn direct_join_counts_pending_seat_claims() {
    let (service, _, _, _, course_id) = service_with_course("CS-101", 1);

    service
        .enroll(StudentId("s1".to_string()), course_id)
        .expect("enroll succeeds");

    match service.join_with_access_code(StudentId("s2".to_string()), "CODE-CS-101") {
        Err(EnrollmentError::CapacityExhausted) => {}
        other => panic!("expected capacity refusal, got {other:?}"),
    }
}
