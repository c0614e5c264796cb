use crate::infra::{
    DirectoryAuthorizationPolicy, InMemoryCourseDirectory, InMemoryEnrollmentStore,
    LoggingStatusNotifier,
};
use campus_enroll::config::EnrollmentConfig;
use campus_enroll::error::AppError;
use campus_enroll::workflows::enrollment::{
    Actor, AuthorizationPolicy, CourseDirectory, CourseId, CourseSnapshot, CourseStatus,
    EnrollmentOutcome, EnrollmentService, EnrollmentStatus, EnrollmentStore, RoleType,
    StatusNotifier, StudentId, UserId,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seats available in the demo course
    #[arg(long, default_value_t = 2)]
    pub(crate) capacity: u32,
    /// Number of students racing for those seats
    #[arg(long, default_value_t = 3)]
    pub(crate) students: u32,
}

/// Walks one course through admission, approval, withdrawal, and waitlist
/// promotion, printing the statistics after each step.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let capacity = args.capacity.max(1);
    let students = args.students.max(2);

    let store = Arc::new(InMemoryEnrollmentStore::default());
    let directory = InMemoryCourseDirectory::default();
    let course_id = CourseId("DEMO-101".to_string());
    directory.insert(CourseSnapshot {
        id: course_id.clone(),
        name: "Demo Seminar".to_string(),
        teacher_id: UserId("t-demo".to_string()),
        capacity,
        status: CourseStatus::Active,
        access_code: Some("DEMOCODE".to_string()),
    });

    let service = EnrollmentService::new(
        store,
        Arc::new(directory.clone()),
        Arc::new(DirectoryAuthorizationPolicy::new(directory)),
        Arc::new(LoggingStatusNotifier),
        EnrollmentConfig {
            join_fast_path: true,
        },
    );
    let teacher = Actor::new("t-demo", vec![RoleType::Teacher]);

    println!(
        "Enrollment demo: course {course_id} with {capacity} seat(s), {students} student(s)"
    );

    let mut admitted = Vec::new();
    for n in 1..=students {
        let student = format!("s{n}");
        let outcome = service.enroll(StudentId(student.clone()), course_id.clone());
        match outcome {
            Ok(EnrollmentOutcome::Admitted(record)) => {
                println!("  {student}: admitted as {}", record.status.label());
                admitted.push(record);
            }
            Ok(EnrollmentOutcome::Waitlisted(record)) => {
                println!("  {student}: waitlisted ({})", record.id);
            }
            Ok(EnrollmentOutcome::AlreadyEnrolled(_)) => {
                println!("  {student}: already enrolled");
            }
            Err(err) => println!("  {student}: refused ({err})"),
        }
    }
    print_statistics(&service, &course_id)?;

    println!("Approving admitted requests");
    for record in &admitted {
        service.update_status(&record.id, EnrollmentStatus::Approved, &teacher)?;
    }
    print_statistics(&service, &course_id)?;

    if let Some(first) = admitted.first() {
        let owner = Actor::new(first.student_id.0.clone(), vec![RoleType::Student]);
        println!("{} withdraws; the waitlist head is promoted", first.student_id);
        service.withdraw(&first.id, &owner)?;
        print_statistics(&service, &course_id)?;
    }

    Ok(())
}

fn print_statistics<S, C, P, N>(
    service: &EnrollmentService<S, C, P, N>,
    course_id: &CourseId,
) -> Result<(), AppError>
where
    S: EnrollmentStore + 'static,
    C: CourseDirectory + 'static,
    P: AuthorizationPolicy + 'static,
    N: StatusNotifier + 'static,
{
    let stats = service.statistics(course_id)?;
    println!(
        "  statistics: total {} approved {} pending {} waitlisted {} available {}",
        stats.total, stats.approved, stats.pending, stats.waitlisted, stats.available_slots
    );
    Ok(())
}
