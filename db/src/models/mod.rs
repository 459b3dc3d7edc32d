pub mod attendance_record;
pub mod batch;
pub mod batch_student;
pub mod class_session;
pub mod course;
pub mod enrollment;
pub mod enrollment_status_history;
pub mod enrollment_subject;
pub mod schedule_slot;
pub mod subject;
pub mod user;

pub use attendance_record::Entity as AttendanceRecord;
pub use batch::Entity as Batch;
pub use batch_student::Entity as BatchStudent;
pub use class_session::Entity as ClassSession;
pub use course::Entity as Course;
pub use enrollment::Entity as Enrollment;
pub use enrollment_status_history::Entity as EnrollmentStatusHistory;
pub use enrollment_subject::Entity as EnrollmentSubject;
pub use schedule_slot::Entity as ScheduleSlot;
pub use subject::Entity as Subject;
pub use user::Entity as User;
