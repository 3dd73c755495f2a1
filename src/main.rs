fn main() {
    if let Err(err) = motionease_lib::run() {
        log::error!("MotionEase failed: {err:#}");
        eprintln!("MotionEase failed: {err:#}");
        std::process::exit(1);
    }
}
