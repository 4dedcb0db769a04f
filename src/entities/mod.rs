pub mod article;
pub mod client;
pub mod maintenance;
pub mod maintenance_technician;
pub mod order;
pub mod sale;
pub mod sale_article;
pub mod technician;
