fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    // Pass through RSVP_GIT_HASH from reproducible build environments
    println!("cargo:rerun-if-env-changed=RSVP_GIT_HASH");
    if let Ok(hash) = std::env::var("RSVP_GIT_HASH") {
        println!("cargo:rustc-env=RSVP_GIT_HASH={}", hash);
    }
}
