fn main() {
    // Embedded sqlx migrations are compiled in, so rebuild when they change
    println!("cargo:rerun-if-changed=migrations");
}
