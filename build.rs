fn main() {
    // ESP-IDF sysenv propagation — only when building for the device.
    // Host-target test builds skip the espidf feature entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
