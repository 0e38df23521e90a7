pub mod sqlite_booking_repo;
pub mod sqlite_program_repo;
pub mod sqlite_template_repo;

pub mod postgres_booking_repo;
pub mod postgres_program_repo;
pub mod postgres_template_repo;
