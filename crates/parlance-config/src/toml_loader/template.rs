//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Parlance Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[backend]
# base_url = "http://localhost:8001"
# chat_path = "/chat"
# image_path = "/generate_image"
# connect_timeout_secs = 10   # 1-300

[chat]
# max_tokens = 800            # 1-32768

[images]
# size = "512x512"            # 128x128, 256x256, 512x512, 1024x1024
# style = "photorealistic"
# log_capacity = 30           # 1-1000

[storage]
# data_dir = "/path/to/parlance-data"

[logging]
# level = "info"              # debug, info, warn, error
"##
    .to_string()
}
