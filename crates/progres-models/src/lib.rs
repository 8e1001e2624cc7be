//! # PROGRES Models
//!
//! Data shapes exchanged by the gateway:
//!
//! - [`auth`]: Login/refresh/logout bodies and the upstream authentication reply
//! - [`academic`]: Upstream academic records (registrations, reports, grades)
//! - [`calculator`]: Weighted-average calculator over one period
//! - [`recommendations`]: Study-path recommendation DTOs and the academic
//!   structure catalog

pub mod academic;
pub mod auth;
pub mod calculator;
pub mod recommendations;

pub use academic::{
    CcGrade, ExamGrade, ModuleReport, PeriodReport, PeriodSummary, Registration, StudentCard,
    SubjectCoefficient, TeachingUnitReport,
};
pub use auth::{LoginRequest, LoginResponse, LogoutResponse, UpstreamAuthResponse};
