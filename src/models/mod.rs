// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AnalyticsEvent, Category, ContactCapture, Deal, DispensaryRef, DispensarySummary, DiversityCaps,
    PersonalizedDeal, PriceRange, RawProduct, SavedDeal, ScoreReason, ScoringWeights, SharedSave,
    UserPreferences, UserStats,
};
pub use requests::{
    AnonQuery, ContactRequest, CreateShareRequest, FeedQuery, RecordEventRequest, SaveDealRequest,
    SearchQuery,
};
pub use responses::{
    BadgesResponse, CacheStats, ContactResponse, DispensariesResponse, ErrorResponse, FeedResponse, HealthResponse,
    RecordEventResponse, SaveResponse, SavedDealsResponse, ShareResponse, SharedDealsResponse,
    TweetResponse,
};
