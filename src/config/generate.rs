pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# YTAIL CONFIGURATION
# =============================================================================
# ytail follows the active log file in one directory and ships its lines, in
# batches, to a log ingestion push endpoint.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/ytail/config.yml
#   3. /etc/ytail/config.yml
#
# Any value may reference an environment variable as $env{NAME}.

# =============================================================================
# TAILER
# =============================================================================
tailer:
  # Directory containing the log file. It must exist; the file itself may
  # appear later.
  scrape_path: /var/log/app

  # Regex matched against file names in scrape_path. A newly created file that
  # matches replaces the current one (rotation).
  file_pattern: '\.log$'

  # Where to start in the file found at startup: 'beginning' or 'end'
  start: beginning

# =============================================================================
# CLIENT
# =============================================================================
client:
  push_url: http://localhost:3100/loki/api/v1/push

  # Static labels attached to every pushed stream (at least one required)
  labels:
    service_name: app

  # Push attempts per batch, and exponential backoff between them
  retry: 5
  backoff: 1s
  max_backoff: 1m

  # A batch is pushed once it holds more than batch_max_size bytes of log
  # lines, or once batch_max_wait has passed, whichever comes first.
  batch_max_size: 1048576
  batch_max_wait: 1s

  # Lines waiting for the batcher. When full, tailing pauses until space frees.
  queue_capacity: 4096

  # Per-request HTTP timeout
  timeout: 3s
"#
    .to_string()
}
