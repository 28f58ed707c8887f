fn main() {
    println!("cargo:rerun-if-env-changed=RELAYCTL_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=RELAYCTL_WIFI_PASSWORD");

    // Host builds (tests, simulation) have no ESP-IDF environment to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
