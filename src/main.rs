use regionsmith::app::RegionEditorApp;

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Region Editor",
        native_options,
        Box::new(|cc| Ok(Box::new(RegionEditorApp::new(cc)))),
    )
}
