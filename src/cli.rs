// Command-line interface definition

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bro-awk")]
#[command(about = "Filter Bro/Zeek logs by field name, in parallel")]
#[command(
    long_about = "Filter Bro/Zeek tab-separated logs by field name, in parallel\n\n\
FILTER SYNTAX:\n  \
  <fields><op><values>    fields and values are comma-separated lists\n  \
  =    field equals value          !=   field does not equal value\n  \
  ~    field matches regex         !~   field does not match regex\n\n  \
Every field of a rule is checked against every value, and every rule must\n  \
hold for a line to be printed. Use --any-value to accept a field when any\n  \
one of its values holds.\n\n\
LOG FILES:\n  \
  Arguments ending in .log or .log.gz are read in the order given. Compressed\n  \
  logs go through gzcat, unpigz or zcat unless --unzipper or --builtin-gzip\n  \
  is set.\n\n\
EXAMPLES:\n  \
  bro-awk proto=tcp conn.log\n  \
  bro-awk id.orig_h,id.resp_h!=10.0.0.1 conn.*.log.gz\n  \
  bro-awk 'host~\\.example\\.com$' -p ts,host,uri http.log"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Filter rules (FIELDS<op>VALUES) and log files (*.log, *.log.gz), in any order
    #[arg(value_name = "FILTER|LOG")]
    pub args: Vec<String>,

    /// Only print the listed fields, tab-separated, in the given order
    #[arg(
        short = 'p',
        long = "print-fields",
        value_delimiter = ',',
        help_heading = "Output Options"
    )]
    pub print_fields: Option<Vec<String>>,

    /// Print processing statistics to stderr when done
    #[arg(long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Accept a field when any one of a rule's values holds, instead of all of them
    #[arg(long = "any-value", help_heading = "Filtering Options")]
    pub any_value: bool,

    /// Program used to decompress .gz logs (run as `<PROGRAM> -c <file>`)
    #[arg(
        short = 'u',
        long = "unzipper",
        env = "BRO_AWK_UNZIPPER",
        value_name = "PROGRAM",
        help_heading = "Input Options"
    )]
    pub unzipper: Option<String>,

    /// Decompress .gz logs in-process instead of running an external program (overrides --unzipper)
    #[arg(long = "builtin-gzip", help_heading = "Input Options")]
    pub builtin_gzip: bool,

    /// Number of parser threads (default: number of CPUs minus one)
    #[arg(
        short = 't',
        long = "threads",
        env = "BRO_AWK_THREADS",
        default_value_t = 0,
        help_heading = "Performance Options"
    )]
    pub threads: usize,

    /// Bytes read from a log per block
    #[arg(
        short = 'b',
        long = "block-size",
        env = "BRO_AWK_BLOCK_SIZE",
        default_value_t = crate::chunker::DEFAULT_BLOCK_SIZE,
        help_heading = "Performance Options"
    )]
    pub block_size: usize,

    /// Maximum number of chunks waiting for a parser thread
    #[arg(
        long = "queue-size",
        default_value_t = crate::config::DEFAULT_QUEUE_SIZE,
        help_heading = "Performance Options"
    )]
    pub queue_size: usize,

    /// Print progress to stderr (-vv for more detail)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
