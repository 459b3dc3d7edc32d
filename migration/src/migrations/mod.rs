pub mod m202607010001_create_users;
pub mod m202607010002_create_courses;
pub mod m202607010003_create_batches;
pub mod m202607010004_create_class_sessions;
pub mod m202607010005_create_attendance_records;
pub mod m202607010006_create_enrollments;
