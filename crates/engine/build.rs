// crates/engine/build.rs
fn main() {
    let f = |n| std::env::var(format!("CARGO_FEATURE_{}", n)).is_ok();

    if f("HTTP_URLS") && !f("HTTP_FETCH") {
        panic!("feature 'http_urls' requires 'http-fetch'");
    }
}
