use beauty::{Error, Location, VmConfig};
use pretty_assertions::assert_eq;

fn interpret_with(source: &str, input: &str, config: VmConfig) -> (Result<(), Error>, String) {
    let mut output = Vec::new();
    let result = beauty::run(source, config, input.as_bytes(), &mut output);
    (result, String::from_utf8(output).unwrap())
}

/// Runs a program that must succeed and returns what it printed.
fn interpret(source: &str) -> String {
    let (result, output) = interpret_with(source, "", VmConfig::default());
    if let Err(err) = result {
        panic!("{}\noutput so far:\n{}", err, output);
    }
    output
}

fn fault(source: &str) -> String {
    interpret_with(source, "", VmConfig::default())
        .0
        .unwrap_err()
        .to_string()
}

#[test]
fn variables() {
    assert_eq!(interpret("x : number = 2\nx = x + 3\nprint x\n"), "5\n");
    assert_eq!(
        interpret("greeting : = 'hello'\ngreeting += \", world\"\nprint greeting\n"),
        "hello, world\n"
    );
}

#[test]
fn blank_lines() {
    assert_eq!(interpret("\nx : number = 1\n\n   \nprint x\n"), "1\n");
}

#[test]
fn division_by_zero_prints_nothing() {
    let (result, output) = interpret_with("x : number = 1 / 0\nprint x\n", "", VmConfig::default());
    assert_eq!(
        result,
        Err(Error::runtime("division by 0", Some(Location::new(1, 1))))
    );
    assert_eq!(output, "");
}

#[test]
fn output_before_fault_is_kept() {
    let (result, output) = interpret_with("print 1\nprint [1][3]\n", "", VmConfig::default());
    assert_eq!(
        result.unwrap_err().to_string(),
        "Runtime error (line 2, col 1): array index out of bounds"
    );
    assert_eq!(output, "1\n");
}

#[test]
fn faults_are_reported_with_kind_and_location() {
    assert_eq!(fault("if true\n"), "Syntax error (line 2, col 1): expected if block");
    assert_eq!(
        fault("x : number = 1\nx = 'one'\n"),
        "Semantic error (line 2, col 1): incompatible type for assignment to x"
    );
    assert_eq!(
        fault("print 1\nprint y\n"),
        "Semantic error (line 2, col 1): y is undefined in this context"
    );
}

#[test]
fn semantic_faults_stop_the_run() {
    let (result, output) = interpret_with("print 1\nprint 1 + 'a'\n", "", VmConfig::default());
    assert_eq!(result.unwrap_err().message(), "invalid operands");
    assert_eq!(output, "");
}

mod arrays {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn negative_index() {
        assert_eq!(interpret("a : array<number> = [1, 2, 3]\nprint a[-1]\n"), "3\n");
    }

    #[test]
    fn nested_arrays_and_inference() {
        assert_eq!(
            interpret("grid : = [[], [1, 2]]\ngrid[0] = [5]\nprint grid[0][0] + grid[1][1]\n"),
            "7\n"
        );
    }

    #[test]
    fn arrays_are_copied() {
        assert_eq!(
            interpret(
                "def bump(a : array<number>) : array<number>\n  a[0] += 1\n  return a\n\
                 x : array<number> = [1]\ny : = bump(x)\nprint x[0]\nprint y[0]\n"
            ),
            "1\n2\n"
        );
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn for_over_string() {
        assert_eq!(interpret("for c : \"ab\"\n  print c\n"), "a\nb\n");
    }

    #[test]
    fn while_and_if() {
        assert_eq!(
            interpret(
                "total : number\ni : number = 1\nwhile i <= 10\n  if i % 2 == 0\n    total += i\n  i += 1\nprint total\n"
            ),
            "30\n"
        );
    }

    #[test]
    fn else_branch() {
        assert_eq!(
            interpret("if 1 > 2\n  print 'no'\nelse\n  print 'yes'\n"),
            "yes\n"
        );
    }
}

mod scoping {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_locals_disappear() {
        assert_eq!(
            fault("if true\n  inner : number = 1\nprint inner\n"),
            "Semantic error (line 3, col 1): inner is undefined in this context"
        );
    }

    #[test]
    fn outer_names_are_mutable_from_inner_blocks() {
        assert_eq!(
            interpret("x : number = 1\nwhile x < 3\n  x += 1\nprint x\n"),
            "3\n"
        );
    }

    #[test]
    fn shadowing() {
        assert_eq!(
            interpret("x : number = 1\nif true\n  x : string = 'two'\n  print x\nprint x\n"),
            "two\n1\n"
        );
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn functions_with_params() {
        assert_eq!(
            interpret("def f(n : number) : number\n  return n * 2\nprint f(21)\n"),
            "42\n"
        );
    }

    #[test]
    fn recursion() {
        assert_eq!(
            interpret(
                "def fact(n : number) : number\n  if n <= 1\n    return 1\n  return n * fact(n - 1)\nprint fact(10)\n"
            ),
            "3.6288e+06\n"
        );
    }

    #[test]
    fn void_function_as_statement() {
        assert_eq!(
            interpret("def greet(name : string)\n  print 'hi ' + name\n  return\ngreet('bob')\n"),
            "hi bob\n"
        );
    }

    #[test]
    fn recursion_limit() {
        let source = "def down(n : number) : number\n  if n == 0\n    return 0\n  return down(n - 1)\nprint down(100)\n";
        let (result, _) = interpret_with(source, "", VmConfig { max_call_depth: 50 });
        assert_eq!(
            result.unwrap_err().to_string(),
            "Runtime error (line 4, col 3): maximum call depth of 50 exceeded"
        );
        let (result, output) = interpret_with(source, "", VmConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(output, "0\n");
    }

    #[test]
    fn wrong_arguments() {
        assert_eq!(
            fault("def f(n : number) : number\n  return n\nprint f()\n"),
            "Semantic error (line 3, col 1): wrong number of arguments"
        );
        assert_eq!(
            fault("def f(n : number) : number\n  return n\nprint f('1')\n"),
            "Semantic error (line 3, col 1): incompatible type for argument n of f"
        );
    }
}

#[test]
fn read_from_input() {
    let (result, output) = interpret_with(
        "name : string\nage : number\nread name\nread age\nprint name + ' is ' + 'old'\nprint age + 1\n",
        "ada 36\n",
        VmConfig::default(),
    );
    assert_eq!(result, Ok(()));
    assert_eq!(output, "ada is old\n37\n");
}
