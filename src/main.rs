use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use log::{debug, error, warn};

use cameractrls::{parse_controls, CameraCtrls, Device};

/// List and set camera controls
#[derive(Parser, Debug)]
#[command(name = "cameractrls", version, about, long_about = None)]
#[command(after_help = "example:\n  cameractrls -c brightness=128,kiyo_pro_hdr=on,kiyo_pro_fov=wide")]
struct Args {
    /// use DEVICE (a path, or N for /dev/videoN)
    #[arg(short, value_name = "DEVICE", default_value = "/dev/video0", value_parser = device_path)]
    device: PathBuf,

    /// list the controls and values
    #[arg(short, long)]
    list: bool,

    /// set CONTROLS (eg.: hdr=on,fov=wide)
    #[arg(short, value_name = "CONTROLS")]
    controls: Option<String>,
}

fn device_path(arg: &str) -> Result<PathBuf, String> {
    if arg.is_empty() {
        return Err("empty device".to_string());
    }
    match arg.parse::<usize>() {
        Ok(index) => Ok(PathBuf::from(format!("/dev/video{}", index))),
        Err(_) => Ok(PathBuf::from(arg)),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if std::env::args_os().len() <= 1 {
        if let Err(e) = Args::command().print_help() {
            error!("{}", e);
        }
        return ExitCode::SUCCESS;
    }

    // usage errors exit with 2, --help and --version with 0
    let args = Args::parse();

    let dev = match Device::with_path(&args.device) {
        Ok(dev) => dev,
        Err(e) => {
            error!("open({}) failed: {}", args.device.display(), e);
            return ExitCode::from(2);
        }
    };

    match dev.query_caps() {
        Ok(caps) if !caps.is_video_capture() => {
            warn!("{} is not a video capture device", args.device.display())
        }
        Ok(caps) => debug!("{}:\n{}", args.device.display(), caps),
        Err(e) => warn!("VIDIOC_QUERYCAP failed: {}", e),
    }

    let mut camera = CameraCtrls::new(&args.device, Arc::new(dev));

    if args.list {
        if let Err(e) = camera.print_ctrls() {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(controls) = args.controls.as_deref().filter(|c| !c.is_empty()) {
        camera.set_ctrls(&parse_controls(controls));
    }

    ExitCode::SUCCESS
}
