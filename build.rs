use time::OffsetDateTime;

/// Export `var` to the crate, taking an override from the environment or
/// formatting the build timestamp.
fn stamp(var: &str, now: OffsetDateTime, pattern: &str) {
    println!("cargo:rerun-if-env-changed={}", var);
    let value = std::env::var(var).ok().unwrap_or_else(|| {
        time::format_description::parse(pattern)
            .ok()
            .and_then(|fmt| now.format(&fmt).ok())
            .unwrap_or_else(|| "unknown".into())
    });
    println!("cargo:rustc-env={}={}", var, value);
}

fn main() {
    let now = OffsetDateTime::now_utc();
    stamp("RAYTRACER_BUILD_DATE", now, "[year]-[month]-[day]");
    stamp("RAYTRACER_BUILD_TIME", now, "[hour]:[minute] UTC");
}
