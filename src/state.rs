use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::{
    BookingRepository, PaymentProcessor, ProgramRepository, TemplateRepository,
};
use crate::domain::services::reconciler::BookingReconciler;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub template_repo: Arc<dyn TemplateRepository>,
    pub program_repo: Arc<dyn ProgramRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_service: Arc<dyn PaymentProcessor>,
    pub reconciler: Arc<BookingReconciler>,
}
