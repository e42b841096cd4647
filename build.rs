fn main() {
    println!("cargo:rerun-if-env-changed=XRCELINK_CONFIG");

    // ESP-IDF link arguments are only needed when building for the device.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
