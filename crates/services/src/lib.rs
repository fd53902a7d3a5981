#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod navigation;
pub mod results_service;
pub mod sessions;
pub mod user_service;

pub use gradeup_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, NavigationError, ResultsError, TestError, UserServiceError};
pub use navigation::{Navigator, Screen, TestPlan};
pub use results_service::{
    DEFAULT_LEADERBOARD_LIMIT, DashboardStats, LeaderboardItem, ResultsService, SubjectAverage,
};
pub use sessions::{ActiveTest, TestLoopService, TestOutcome};
pub use user_service::UserService;
