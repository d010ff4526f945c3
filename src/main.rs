#![forbid(unsafe_code)]

use quickdo::QuickdoApp;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("quickdo")
            .with_inner_size([380.0, 560.0])
            .with_min_inner_size([300.0, 360.0])
            .with_decorations(false)
            .with_transparent(true),
        ..Default::default()
    };
    eframe::run_native(
        "quickdo",
        options,
        Box::new(|_cc| {
            let app = QuickdoApp::new()?;
            Ok(Box::new(app))
        }),
    )
}
