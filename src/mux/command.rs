use std::path::Path;

/// Abstract muxing command representation
#[derive(Debug, Clone)]
pub struct MuxCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MuxCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream without re-encoding
    pub fn copy_video(self) -> Self {
        self.arg("-c:v").arg("copy")
    }
}

/// Builder for the muxing operations pipegrab needs
pub struct MuxCommandBuilder {
    binary_path: String,
}

impl MuxCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the merge command: copy the video track unchanged, transcode
    /// audio to the given codec, overwrite the output without prompting.
    pub fn merge<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        audio_codec: &str,
    ) -> MuxCommand {
        MuxCommand::new(&self.binary_path, "Audio/video merge")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .copy_video()
            .audio_codec(audio_codec)
            .arg("-strict")
            .arg("experimental")
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MuxCommand {
        MuxCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
