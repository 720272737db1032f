/// A model response with prose around two fenced blocks, the first tagged
/// with a language.
pub fn response_fixture() -> &'static str {
    return r#"
Here's a program that prints the numbers from 0 to 10.

```python
for i in range(11):
    print(i)
```

If you'd rather have a shell version, this works too.

```
seq 0 10
```

That's it!
"#
    .trim();
}

/// Stderr of a Python program that failed at runtime.
pub fn traceback_fixture() -> &'static str {
    return r#"Traceback (most recent call last):
  File "generated_programs/generated_20240101_120000.py", line 1, in <module>
    print(undefined_name)
NameError: name 'undefined_name' is not defined
"#;
}

/// Wraps code in a fenced block the way a model answering the system prompt
/// would.
pub fn fenced(code: &str) -> String {
    return format!("Sure! Here is the program.\n\n```python\n{code}\n```\n");
}
