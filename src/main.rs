/*
This code is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

/*!
lsp_tools is a command-line program for deriving land surface parameters
from digital elevation models. The following commands are recognized:

| Command           | Description                                                              |
| ----------------- | ------------------------------------------------------------------------ |
| --cd, --wd        | Changes the working directory; used in conjunction with --run flag.      |
| -h, --help        | Prints help information.                                                 |
| -l, --license     | Prints the lsp_tools license.                                            |
| --listtools       | Lists all available tools. Keywords may also be used, --listtools slope. |
| --max_procs       | Sets the maximum number of processors used by tools.                     |
| -r, --run         | Runs a tool; used in conjunction with --wd flag; -r="Slope".             |
| --toolbox         | Prints the toolbox associated with a tool; --toolbox=Slope.              |
| --toolhelp        | Prints the help associated with a tool; --toolhelp="Slope".              |
| --toolparameters  | Prints the parameters (in json form) for a specific tool.                |
| -v                | Verbose mode. Without this flag, tool outputs will not be printed.       |
| --version         | Prints the version information.                                          |
*/

use lsp_tools::configs;
use lsp_tools::tools::{unquote, ToolManager};
use std::env;
use std::io::{Error, ErrorKind};
use std::path;
use std::process;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

/// Splits `--flag=value` into the normalised flag (single leading dash,
/// lower case) and its value without enclosing quotes.
fn split_arg(arg: &str) -> (String, String) {
    let (flag, value) = match arg.split_once('=') {
        Some((f, v)) => (f, v),
        None => (arg, ""),
    };
    let flag = format!("-{}", flag.trim_start_matches('-').to_lowercase());
    let value = unquote(value);
    (flag, value)
}

fn run() -> Result<(), Error> {
    let sep: &str = &path::MAIN_SEPARATOR.to_string();
    let mut tool_name = String::new();
    let mut run_tool = false;
    let mut tool_help = false;
    let mut tool_parameters = false;
    let mut toolbox = false;
    let mut list_tools = false;
    let mut keywords: Vec<String> = vec![];
    let mut tool_args_vec: Vec<String> = vec![];
    let mut verbose = false;
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        version();
        help();
        return Ok(());
    }

    let mut configs = configs::get_configs()?;
    let mut configs_modified = false;

    for arg in args {
        let (flag_val, v) = split_arg(&arg);
        if !arg.starts_with('-') {
            if tool_args_vec.is_empty() {
                keywords.push(unquote(&arg));
            } else {
                tool_args_vec.push(arg.trim().to_string());
            }
            continue;
        }
        match flag_val.as_str() {
            "-h" | "-help" => {
                help();
                return Ok(());
            }
            "-cd" | "-wd" | "-working_directory" => {
                let mut working_dir = v;
                if !working_dir.is_empty() && !working_dir.ends_with(sep) && !working_dir.ends_with('/') {
                    working_dir.push_str(sep);
                }
                if configs.working_directory != working_dir {
                    configs.working_directory = working_dir;
                    configs_modified = true;
                }
            }
            "-r" | "-run" => {
                tool_name = v;
                run_tool = true;
            }
            "-toolhelp" => {
                tool_name = v;
                tool_help = true;
            }
            "-toolparameters" => {
                tool_name = v;
                tool_parameters = true;
            }
            "-toolbox" => {
                tool_name = v;
                toolbox = true;
            }
            "-listtools" | "-list_tools" => list_tools = true,
            "-l" | "-license" | "-licence" => {
                license();
                return Ok(());
            }
            "-version" => {
                version();
                return Ok(());
            }
            "-v" | "-verbose" => {
                verbose = v.is_empty() || v.to_lowercase().contains('t');
            }
            "-max_procs" => {
                let val = v.parse::<isize>().map_err(|_| {
                    Error::new(ErrorKind::InvalidInput, format!("Error parsing --max_procs value '{}'.", v))
                })?;
                if val != configs.max_procs {
                    configs.max_procs = val;
                    configs_modified = true;
                }
            }
            // anything else is an argument to be fed to the tool
            _ => tool_args_vec.push(arg.trim().to_string()),
        }
    }

    if configs_modified {
        configs::save_configs(&configs)?;
    }

    let tm = ToolManager::new(&configs.working_directory, &(verbose || configs.verbose_mode))?;
    if tool_name.is_empty() && !keywords.is_empty() && (run_tool || tool_help || tool_parameters) {
        tool_name = keywords[0].clone();
    }
    if run_tool {
        return tm.run_tool(tool_name, tool_args_vec);
    } else if tool_help {
        return tm.tool_help(tool_name);
    } else if tool_parameters {
        println!("{}", tm.tool_parameters(tool_name)?);
    } else if toolbox {
        return tm.toolbox(tool_name);
    } else if list_tools {
        let tools = if keywords.is_empty() {
            tm.list_tools()
        } else {
            tm.list_tools_with_keywords(keywords)
        };
        println!("All {} available tools:", tools.len());
        for (name, description) in tools {
            println!("{}: {}", name, description);
        }
    }

    Ok(())
}

fn help() {
    let mut ext = "";
    if cfg!(target_os = "windows") {
        ext = ".exe";
    }

    let exe_name = &format!("lsp_tools{}", ext);
    let sep: String = path::MAIN_SEPARATOR.to_string();
    let s = "lsp_tools Help

The following commands are recognized:
--cd, --wd          Changes the working directory; used in conjunction with --run flag.
-h, --help          Prints help information.
-l, --license       Prints the lsp_tools license.
--listtools         Lists all available tools. Keywords may also be used, --listtools slope.
--max_procs         Sets the maximum number of processors used. -1 = all available processors. e.g. --max_procs=2
-r, --run           Runs a tool; used in conjunction with --wd flag; -r=\"Slope\".
--toolbox           Prints the toolbox associated with a tool; --toolbox=Slope.
--toolhelp          Prints the help associated with a tool; --toolhelp=\"Slope\".
--toolparameters    Prints the parameters (in json form) for a specific tool; --toolparameters=\"Slope\".
-v                  Verbose mode. Without this flag, tool outputs will not be printed.
--version           Prints the version information.

Example Usage:
>> .*EXE_NAME -r=LandSurfaceParameters -v --wd=\"*path*to*data*\" --dem=dem.sgrd --all --tpi_radius=100
"
    .replace('*', &sep)
    .replace("EXE_NAME", exe_name);
    println!("{}", s);
}

fn license() {
    let license_text = "lsp_tools License

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the \"Software\"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.";
    println!("{}", license_text);
}

fn version() {
    const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
    println!("lsp_tools v{}", VERSION.unwrap_or("unknown"));
}
