//! Generated HTML pages: the tools index and the Taskwarrior web UI.
//!
//! Both consume the rest of the server over plain HTTP; the UI talks to
//! /api/tasks like any other client.

pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="theme-color" content="#1a1a2e">
  <title>Herramientas</title>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, system-ui, sans-serif; background: #1a1a2e; color: #eee;
           display: flex; justify-content: center; align-items: center; min-height: 100vh; }
    h1 { text-align: center; margin-bottom: 24px; font-weight: 300; font-size: 1.4em; color: #888; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 20px;
            max-width: 600px; padding: 20px; }
    a { text-decoration: none; color: #eee; background: #16213e; border-radius: 16px;
        padding: 32px 20px; text-align: center; font-size: 1.1em; font-weight: 500;
        transition: transform 0.15s, background 0.15s; }
    a:hover { transform: scale(1.05); background: #0f3460; }
    .emoji { font-size: 2.5em; display: block; margin-bottom: 12px; }
  </style>
</head>
<body>
  <div>
    <h1>Herramientas</h1>
    <div class="grid">
      <a href="/timer"><span class="emoji">&#9201;</span>Timer</a>
      <a href="/pos"><span class="emoji">&#129366;</span>POS Panaderia</a>
      <a href="/calendario"><span class="emoji">&#128197;</span>Calendario</a>
      <a href="/taskwarrior"><span class="emoji">&#9989;</span>Taskwarrior</a>
    </div>
  </div>
</body>
</html>
"##;

pub const TASKWARRIOR_HTML: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0, user-scalable=no">
  <title>Taskwarrior</title>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: -apple-system, system-ui, sans-serif; background: #1a1a2e; color: #eee; }
    header { padding: 12px 16px; background: #16213e; position: sticky; top: 0; z-index: 10;
             display: flex; align-items: center; gap: 12px; }
    header h1 { font-size: 1.1em; font-weight: 500; flex: 1; }
    .hamburger { background: none; border: none; color: #eee; font-size: 1.4em; cursor: pointer; padding: 4px; }
    .filters { display: flex; gap: 8px; padding: 12px 16px; overflow-x: auto; }
    .filters button { background: #16213e; color: #aaa; border: none; padding: 8px 16px;
                      border-radius: 20px; font-size: 0.85em; white-space: nowrap; cursor: pointer; }
    .filters button.active { background: #0f3460; color: #fff; }
    .task-list { padding: 8px 16px 80px; }
    .task { background: #16213e; border-radius: 12px; padding: 14px 16px; margin-bottom: 8px;
            display: flex; align-items: flex-start; gap: 12px; }
    .task.completed { opacity: 0.4; }
    .task-check { width: 24px; height: 24px; border: 2px solid #555; border-radius: 50%;
                  cursor: pointer; flex-shrink: 0; }
    .task-check.done { background: #4ecca3; border-color: #4ecca3; }
    .task-body { flex: 1; min-width: 0; }
    .task-desc { font-size: 0.95em; word-wrap: break-word; }
    .task-meta { font-size: 0.75em; color: #888; margin-top: 4px; display: flex; gap: 8px; flex-wrap: wrap; }
    .task-meta .project { color: #4ecca3; }
    .task-meta .due { color: #e94560; }
    .task-meta .tag { color: #c89b3c; }
    .annotation { font-size: 0.75em; color: #777; font-style: italic; display: block; margin-top: 2px; }
    .empty { text-align: center; padding: 40px; color: #555; }
    .add-bar { position: fixed; bottom: 0; left: 0; right: 0; padding: 12px 16px;
               background: #16213e; border-top: 1px solid #0f3460; display: flex; gap: 8px; }
    .add-bar input { flex: 1; background: #1a1a2e; border: 1px solid #333; border-radius: 8px;
                     padding: 10px 14px; color: #eee; font-size: 0.95em; outline: none; }
    .add-bar button { background: #4ecca3; color: #1a1a2e; border: none; border-radius: 8px;
                      padding: 10px 16px; font-weight: 600; cursor: pointer; }
    .project-sidebar { display: none; position: fixed; top: 0; left: 0; bottom: 0; width: 280px;
                       background: #16213e; z-index: 20; padding: 60px 16px 16px; overflow-y: auto; }
    .project-sidebar.open { display: block; }
    .project-item { padding: 10px 14px; border-radius: 8px; cursor: pointer;
                    margin-bottom: 4px; font-size: 0.9em; }
    .project-item:hover, .project-item.active { background: #0f3460; }
    .project-item .count { color: #555; float: right; }
    .overlay { display: none; position: fixed; inset: 0; background: rgba(0,0,0,0.5); z-index: 15; }
    .overlay.open { display: block; }
    @media (min-width: 768px) {
      .project-sidebar { display: block; }
      .overlay { display: none !important; }
      .hamburger.menu { display: none; }
      header, .filters, .task-list, .add-bar { padding-left: 296px; }
    }
  </style>
</head>
<body>
  <div class="overlay" id="overlay" onclick="toggleSidebar(false)"></div>
  <div class="project-sidebar" id="sidebar">
    <div class="project-item active" onclick="filterProject('', this)">
      Todas <span class="count" id="countAll"></span>
    </div>
    <div id="projectList"></div>
  </div>

  <header>
    <button class="hamburger menu" onclick="toggleSidebar()">&#9776;</button>
    <h1 id="headerTitle">Taskwarrior</h1>
    <button class="hamburger" onclick="refreshTasks()">&#8635;</button>
  </header>

  <div class="filters" id="filters">
    <button class="active" onclick="setFilter('status:pending', this)">Pending</button>
    <button onclick="setFilter('status:pending +next', this)">Next</button>
    <button onclick="setFilter('status:pending +now', this)">Now</button>
    <button onclick="setFilter('status:completed', this)">Done</button>
    <button onclick="setFilter('', this)">All</button>
  </div>

  <div class="task-list" id="taskList"><div class="empty">Cargando...</div></div>

  <div class="add-bar">
    <input type="text" id="addInput" placeholder="Nueva tarea..."
           onkeydown="if(event.key==='Enter')addTask()">
    <button onclick="addTask()">+</button>
  </div>

<script>
let currentFilter = 'status:pending';
let currentProject = '';
let tasks = [];

async function api(method, body) {
  const opts = { method };
  if (body) { opts.headers = {'Content-Type':'application/json'}; opts.body = JSON.stringify(body); }
  const url = method === 'GET'
    ? '/api/tasks?filter=' + encodeURIComponent(currentFilter)
    : '/api/tasks';
  const r = await fetch(url, opts);
  return r.json();
}

async function refreshTasks() {
  tasks = await api('GET');
  renderProjects();
  if (currentProject) tasks = tasks.filter(t => t.project === currentProject);
  tasks.sort((a, b) => (b.urgency || 0) - (a.urgency || 0));
  render();
}

function render() {
  const el = document.getElementById('taskList');
  if (!tasks.length) { el.innerHTML = '<div class="empty">Sin tareas</div>'; return; }
  el.innerHTML = tasks.map(t => {
    const done = t.status === 'completed';
    const meta = [];
    if (t.project) meta.push('<span class="project">' + esc(t.project) + '</span>');
    if (t.due) meta.push('<span class="due">' + formatDate(t.due) + '</span>');
    if (t.tags) t.tags.forEach(tag => meta.push('<span class="tag">+' + esc(tag) + '</span>'));
    const annots = (t.annotations || []).map(a =>
      '<span class="annotation">' + esc(a.description) + '</span>').join('');
    return '<div class="task ' + (done ? 'completed' : '') + '">'
      + '<div class="task-check ' + (done ? 'done' : '') + '" onclick="markDone(\'' + t.uuid + '\', ' + done + ')"></div>'
      + '<div class="task-body"><div class="task-desc">' + esc(t.description) + '</div>'
      + '<div class="task-meta">' + meta.join('') + '</div>' + annots + '</div></div>';
  }).join('');
}

function renderProjects() {
  const counts = {};
  tasks.forEach(t => { if (t.project) counts[t.project] = (counts[t.project] || 0) + 1; });
  document.getElementById('countAll').textContent = tasks.length || '';
  document.getElementById('projectList').innerHTML = Object.keys(counts).sort().map(p =>
    '<div class="project-item ' + (currentProject === p ? 'active' : '') + '"'
    + ' onclick="filterProject(\'' + esc(p) + '\', this)">'
    + esc(p) + ' <span class="count">' + counts[p] + '</span></div>').join('');
}

async function markDone(uuid, isDone) {
  if (isDone) return;
  await api('POST', { action: 'done', uuid });
  refreshTasks();
}

async function addTask() {
  const input = document.getElementById('addInput');
  const description = input.value.trim();
  if (!description) return;
  const data = { action: 'add', description };
  if (currentProject) data.project = currentProject;
  await api('POST', data);
  input.value = '';
  refreshTasks();
}

function setFilter(f, btn) {
  currentFilter = f || 'status:pending';
  document.querySelectorAll('.filters button').forEach(b => b.classList.remove('active'));
  if (btn) btn.classList.add('active');
  refreshTasks();
}

function filterProject(p, el) {
  currentProject = p;
  document.getElementById('headerTitle').textContent = p || 'Taskwarrior';
  document.querySelectorAll('.project-item').forEach(item => item.classList.remove('active'));
  if (el) el.classList.add('active');
  toggleSidebar(false);
  refreshTasks();
}

function toggleSidebar(force) {
  const sb = document.getElementById('sidebar');
  const ov = document.getElementById('overlay');
  const open = force !== undefined ? force : !sb.classList.contains('open');
  sb.classList.toggle('open', open);
  ov.classList.toggle('open', open);
}

function formatDate(d) {
  const m = (d || '').match(/(\d{4})(\d{2})(\d{2})/);
  return m ? m[2] + '/' + m[3] : (d || '').slice(0, 10);
}

function esc(s) {
  const div = document.createElement('div');
  div.textContent = s || '';
  return div.innerHTML;
}

refreshTasks();
</script>
</body>
</html>
"##;
