//! Platform detection for camera sources

use std::env;

/// Platform information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformInfo {
    /// macOS (Darwin)
    MacOS,

    /// Raspberry Pi (detected via /proc/device-tree)
    RaspberryPi,

    /// Generic Linux
    Linux,
}

/// Detects current platform
pub fn detect_platform() -> PlatformInfo {
    match env::consts::OS {
        "macos" => PlatformInfo::MacOS,
        "linux" if is_raspberry_pi() => PlatformInfo::RaspberryPi,
        _ => PlatformInfo::Linux,
    }
}

fn is_raspberry_pi() -> bool {
    std::path::Path::new("/proc/device-tree/model").exists()
        || std::path::Path::new("/sys/firmware/devicetree/base/model").exists()
}

/// Gets platform-specific camera device path format
pub fn default_device_path(platform: PlatformInfo, camera_index: usize) -> String {
    match platform {
        PlatformInfo::MacOS => camera_index.to_string(),
        PlatformInfo::RaspberryPi => match camera_index {
            0 => "/base/axi/pcie@1000120000/rp1/i2c@88000/imx219@10".to_string(),
            1 => "/base/axi/pcie@1000120000/rp1/i2c@80000/imx219@10".to_string(),
            _ => format!("/dev/video{}", camera_index),
        },
        PlatformInfo::Linux => format!("/dev/video{}", camera_index),
    }
}

/// Builds the GStreamer source element for a device on the given platform
///
/// A bare index such as `"0"` is accepted everywhere and mapped to the
/// platform's native device naming.
pub fn source_element(platform: PlatformInfo, device: &str) -> String {
    let index = device.parse::<usize>().ok();

    match platform {
        PlatformInfo::MacOS => format!("avfvideosrc device-index={}", index.unwrap_or(0)),
        PlatformInfo::RaspberryPi => match index {
            Some(i) => format!(
                "libcamerasrc camera-name=\"{}\"",
                default_device_path(platform, i)
            ),
            None => format!("libcamerasrc camera-name=\"{}\"", device),
        },
        PlatformInfo::Linux => match index {
            Some(i) => format!("v4l2src device={}", default_device_path(platform, i)),
            None => format!("v4l2src device={}", device),
        },
    }
}

/// Full capture pipeline ending in an RGB appsink named `sink`
///
/// Scaling happens inside the pipeline so frames always arrive at exactly
/// `width`x`height`, whatever mode the device negotiates.
pub fn pipeline_description(
    platform: PlatformInfo,
    device: &str,
    width: u32,
    height: u32,
    fps: u32,
) -> String {
    let mut pipeline = source_element(platform, device);

    pipeline.push_str(" ! queue max-size-buffers=2 leaky=downstream ! videoconvert ! videoscale");
    if fps > 0 {
        pipeline.push_str(" ! videorate");
    }
    pipeline.push_str(&format!(
        " ! video/x-raw,format=RGB,width={},height={}",
        width, height
    ));
    if fps > 0 {
        pipeline.push_str(&format!(",framerate={}/1", fps));
    }
    pipeline.push_str(" ! appsink name=sink max-buffers=2 drop=true sync=false");

    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        let platform = detect_platform();
        assert!(matches!(
            platform,
            PlatformInfo::MacOS | PlatformInfo::Linux | PlatformInfo::RaspberryPi
        ));
    }

    #[test]
    fn test_default_device_path_linux() {
        assert_eq!(default_device_path(PlatformInfo::Linux, 0), "/dev/video0");
        assert_eq!(default_device_path(PlatformInfo::Linux, 1), "/dev/video1");
    }

    #[test]
    fn test_default_device_path_pi() {
        assert_eq!(
            default_device_path(PlatformInfo::RaspberryPi, 0),
            "/base/axi/pcie@1000120000/rp1/i2c@88000/imx219@10"
        );
    }

    #[test]
    fn test_index_maps_to_native_device() {
        assert_eq!(
            source_element(PlatformInfo::Linux, "0"),
            "v4l2src device=/dev/video0"
        );
        assert_eq!(
            source_element(PlatformInfo::Linux, "/dev/video3"),
            "v4l2src device=/dev/video3"
        );
        assert_eq!(
            source_element(PlatformInfo::MacOS, "1"),
            "avfvideosrc device-index=1"
        );
    }

    #[test]
    fn test_pipeline_description() {
        let desc = pipeline_description(PlatformInfo::Linux, "0", 320, 240, 30);
        assert!(desc.starts_with("v4l2src device=/dev/video0"));
        assert!(desc.contains("video/x-raw,format=RGB,width=320,height=240,framerate=30/1"));
        assert!(desc.ends_with("appsink name=sink max-buffers=2 drop=true sync=false"));

        let unpaced = pipeline_description(PlatformInfo::Linux, "0", 320, 240, 0);
        assert!(!unpaced.contains("videorate"));
        assert!(!unpaced.contains("framerate"));
    }
}
