pub mod choose;
pub mod shell;
pub mod sitemap;

pub use choose::{show as choose_show, submit as choose_submit};
pub use shell::app_shell;
pub use sitemap::sitemap;

/// GET /robots.txt
pub async fn robots() -> &'static str {
    "User-agent: *\nDisallow:\nSitemap: /sitemap.xml\n"
}
